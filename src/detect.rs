use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::AnnotationRegistry;
use crate::domain::AnnotationType;
use crate::error::KiraError;

/// File names of every entry in `dir`, sorted.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>, KiraError> {
    let entries = fs::read_dir(dir)
        .map_err(|err| KiraError::Filesystem(format!("read dir {}: {err}", dir.display())))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| KiraError::Filesystem(err.to_string()))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// First registry type whose name occurs (case-insensitively) in any of `names`.
pub fn detect_from_names<S: AsRef<str>>(
    registry: &AnnotationRegistry,
    names: &[S],
) -> Option<AnnotationType> {
    let lowered = names
        .iter()
        .map(|name| name.as_ref().to_lowercase())
        .collect::<Vec<_>>();
    registry
        .iter()
        .map(|spec| spec.annotation_type)
        .find(|kind| {
            let needle = kind.as_str().to_lowercase();
            lowered.iter().any(|name| name.contains(&needle))
        })
}

pub fn detect_annotation_type(
    registry: &AnnotationRegistry,
    dir: &Path,
) -> Result<AnnotationType, KiraError> {
    let names = list_file_names(dir)?;
    let detected = detect_from_names(registry, &names)
        .ok_or_else(|| KiraError::TypeNotDetected(dir.to_path_buf()))?;
    debug!(annotation_type = %detected, files = names.len(), "detected annotation type");
    Ok(detected)
}
