use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

/// Annotation vocabulary of a portal table. Declaration order is the
/// detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum AnnotationType {
    #[serde(rename = "GO", alias = "go")]
    #[value(name = "go")]
    Go,
    #[serde(rename = "KEGG", alias = "kegg")]
    #[value(name = "kegg")]
    Kegg,
    #[serde(rename = "InterPro", alias = "interpro")]
    #[value(name = "interpro")]
    InterPro,
    #[serde(rename = "KOG", alias = "kog")]
    #[value(name = "kog")]
    Kog,
    #[serde(rename = "Signalp", alias = "signalp")]
    #[value(name = "signalp")]
    Signalp,
}

impl AnnotationType {
    pub const ALL: [AnnotationType; 5] = [
        AnnotationType::Go,
        AnnotationType::Kegg,
        AnnotationType::InterPro,
        AnnotationType::Kog,
        AnnotationType::Signalp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationType::Go => "GO",
            AnnotationType::Kegg => "KEGG",
            AnnotationType::InterPro => "InterPro",
            AnnotationType::Kog => "KOG",
            AnnotationType::Signalp => "Signalp",
        }
    }

    pub fn default_key_column(&self) -> &'static str {
        match self {
            AnnotationType::Go => "goAcc",
            AnnotationType::Kegg => "ecNum",
            AnnotationType::InterPro => "iprId",
            AnnotationType::Kog => "kogid",
            AnnotationType::Signalp => "proteinid",
        }
    }

    /// Signalp exports carry one line above the column header.
    pub fn default_header_skip(&self) -> usize {
        match self {
            AnnotationType::Signalp => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationType {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        AnnotationType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| KiraError::UnknownAnnotationType(value.to_string()))
    }
}

/// Dataset/organism identifier encoded in an annotation file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Portal(String);

impl Portal {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationFile {
    pub path: PathBuf,
    pub file_name: String,
    pub portal: Portal,
    pub date: String,
}

impl AnnotationFile {
    pub fn new(path: &Path, portal: Portal, date: String) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            file_name,
            portal,
            date,
        }
    }
}
