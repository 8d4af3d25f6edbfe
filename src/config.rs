use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::AnnotationType;
use crate::error::KiraError;

pub const DEFAULT_CONFIG_FILE: &str = "kira-gc.json";
pub const DEFAULT_NORMALIZATION_TOTAL: f64 = 10_000.0;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub annotation_types: Vec<AnnotationTypeEntry>,
    #[serde(default)]
    pub portal_markers: Option<Vec<String>>,
    #[serde(default)]
    pub normalization_total: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AnnotationTypeEntry {
    pub name: AnnotationType,
    #[serde(default)]
    pub key_column: Option<String>,
    #[serde(default)]
    pub header_skip: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSpec {
    pub annotation_type: AnnotationType,
    pub key_column: String,
    pub header_skip: usize,
}

/// Immutable annotation type -> key column table, in detection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRegistry {
    specs: Vec<AnnotationSpec>,
}

impl AnnotationRegistry {
    pub fn iter(&self) -> impl Iterator<Item = &AnnotationSpec> {
        self.specs.iter()
    }

    pub fn spec(&self, annotation_type: AnnotationType) -> &AnnotationSpec {
        // Seeded from `AnnotationType::ALL`, so the discriminant is the slot.
        &self.specs[annotation_type as usize]
    }

    pub fn key_column(&self, annotation_type: AnnotationType) -> &str {
        &self.spec(annotation_type).key_column
    }

    pub fn header_skip(&self, annotation_type: AnnotationType) -> usize {
        self.spec(annotation_type).header_skip
    }

    fn apply(&mut self, entry: AnnotationTypeEntry) -> Result<(), KiraError> {
        let spec = &mut self.specs[entry.name as usize];
        if let Some(column) = entry.key_column {
            let column = column.trim().to_string();
            if column.is_empty() {
                return Err(KiraError::InvalidConfig(format!(
                    "empty key_column for {}",
                    entry.name
                )));
            }
            spec.key_column = column;
        }
        if let Some(skip) = entry.header_skip {
            spec.header_skip = skip;
        }
        Ok(())
    }
}

impl Default for AnnotationRegistry {
    fn default() -> Self {
        let specs = AnnotationType::ALL
            .into_iter()
            .map(|annotation_type| AnnotationSpec {
                annotation_type,
                key_column: annotation_type.default_key_column().to_string(),
                header_skip: annotation_type.default_header_skip(),
            })
            .collect();
        Self { specs }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub registry: AnnotationRegistry,
    pub portal_markers: Vec<String>,
    pub normalization_total: f64,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            registry: AnnotationRegistry::default(),
            portal_markers: default_portal_markers(),
            normalization_total: DEFAULT_NORMALIZATION_TOTAL,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist. Without one, `kira-gc.json` in the working
    /// directory is used when present and the built-in tables otherwise.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(KiraError::InvalidConfig(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let mut registry = AnnotationRegistry::default();
        for entry in config.annotation_types {
            registry.apply(entry)?;
        }

        let portal_markers = match config.portal_markers {
            Some(markers) if markers.iter().any(|marker| marker.is_empty()) => {
                return Err(KiraError::InvalidConfig(
                    "portal_markers must not contain empty strings".to_string(),
                ));
            }
            Some(markers) => markers,
            None => default_portal_markers(),
        };

        let normalization_total = config
            .normalization_total
            .unwrap_or(DEFAULT_NORMALIZATION_TOTAL);
        if !normalization_total.is_finite() || normalization_total <= 0.0 {
            return Err(KiraError::InvalidConfig(format!(
                "normalization_total must be a positive number, got {normalization_total}"
            )));
        }

        Ok(ResolvedConfig {
            schema_version,
            registry,
            portal_markers,
            normalization_total,
        })
    }
}

pub fn default_portal_markers() -> Vec<String> {
    vec![
        "GeneCatalog".to_string(),
        "filtered".to_string(),
        "KEGG.tab".to_string(),
        "FilteredModels1".to_string(),
    ]
}
