//! Annotation file selection: empty-file filtering, portal and date inference
//! from file names, and one-file-per-portal deduplication.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::detect::list_file_names;
use crate::domain::{AnnotationFile, Portal};
use crate::error::KiraError;
use crate::table::AnnotationTable;

pub const ANNOTATION_EXTENSION: &str = ".tab";
pub const MISSING_DATE: &str = "0000";

/// Portal encoded in an annotation file name.
///
/// The name is split on `_` and scanned for the first token equal to one of
/// `markers`. When that token sits at index `i > 2`, the portal is the first
/// `i` tokens joined with `_`; otherwise (marker at index 0..=2, or no marker
/// at all) it is the first token.
pub fn extract_portal_name<S: AsRef<str>>(file_name: &str, markers: &[S]) -> Portal {
    let parts = file_name.split('_').collect::<Vec<_>>();
    let marker_at = parts
        .iter()
        .position(|part| markers.iter().any(|marker| marker.as_ref() == *part));
    match marker_at {
        Some(index) if index > 2 => Portal::new(parts[..index].join("_")),
        _ => Portal::new(parts[0]),
    }
}

/// Second-to-last `_` token when the name has more than two tokens,
/// [`MISSING_DATE`] otherwise.
pub fn extract_date_token(file_name: &str) -> String {
    let parts = file_name.split('_').collect::<Vec<_>>();
    if parts.len() > 2 {
        parts[parts.len() - 2].to_string()
    } else {
        MISSING_DATE.to_string()
    }
}

/// Unreadable tables count as empty.
pub fn is_empty_file(path: &Path, header_skip: usize) -> bool {
    match AnnotationTable::read(path, header_skip) {
        Ok(table) => table.is_empty(),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "treating unparseable file as empty");
            true
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Empty,
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: SkipReason,
    pub portal: Option<Portal>,
    pub kept: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    pub selected: Vec<AnnotationFile>,
    pub skipped: Vec<SkippedFile>,
}

/// Keeps one file per portal: the one with the greatest date token, the
/// earliest in input order on ties. Portals keep first-appearance order.
pub fn remove_duplicate_files(files: Vec<AnnotationFile>) -> FileSelection {
    let mut groups = IndexMap::<Portal, Vec<AnnotationFile>>::new();
    for file in files {
        groups.entry(file.portal.clone()).or_default().push(file);
    }

    let mut selection = FileSelection::default();
    for (portal, group) in groups {
        let mut latest = 0;
        for (index, file) in group.iter().enumerate() {
            if file.date > group[latest].date {
                latest = index;
            }
        }
        let kept_name = group[latest].file_name.clone();
        for (index, file) in group.into_iter().enumerate() {
            if index == latest {
                selection.selected.push(file);
            } else {
                debug!(file = %file.file_name, kept = %kept_name, "superseded by newer file");
                selection.skipped.push(SkippedFile {
                    file_name: file.file_name,
                    reason: SkipReason::Superseded,
                    portal: Some(portal.clone()),
                    kept: Some(kept_name.clone()),
                });
            }
        }
    }
    selection
}

/// `*.tab` files directly inside `dir`, sorted by file name.
pub fn list_annotation_files(dir: &Path) -> Result<Vec<PathBuf>, KiraError> {
    let paths = list_file_names(dir)?
        .into_iter()
        .filter(|name| name.ends_with(ANNOTATION_EXTENSION))
        .map(|name| dir.join(name))
        .filter(|path| path.is_file())
        .collect();
    Ok(paths)
}

pub fn select_files<S: AsRef<str>>(
    dir: &Path,
    markers: &[S],
    header_skip: usize,
) -> Result<FileSelection, KiraError> {
    let mut skipped = Vec::new();
    let mut candidates = Vec::new();
    for path in list_annotation_files(dir)? {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_empty_file(&path, header_skip) {
            warn!(file = %file_name, "skipping empty annotation file");
            skipped.push(SkippedFile {
                file_name,
                reason: SkipReason::Empty,
                portal: None,
                kept: None,
            });
            continue;
        }
        let portal = extract_portal_name(&file_name, markers);
        let date = extract_date_token(&file_name);
        candidates.push(AnnotationFile::new(&path, portal, date));
    }

    let mut selection = remove_duplicate_files(candidates);
    skipped.append(&mut selection.skipped);
    selection.skipped = skipped;
    Ok(selection)
}
