use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("could not detect annotation type from file names in {0}")]
    #[diagnostic(help("pass --annotation-type go|kegg|interpro|kog|signalp"))]
    TypeNotDetected(PathBuf),

    #[error("unknown annotation type: {0}")]
    UnknownAnnotationType(String),

    #[error("no usable .tab annotation files in {0}")]
    NoAnnotationFiles(PathBuf),

    #[error("failed to parse annotation table {path}: {message}")]
    TableParse { path: PathBuf, message: String },

    #[error("column {column} not found in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("metadata file is missing required column: {0}")]
    MetadataColumn(String),

    #[error("failed to parse metadata file {path}: {message}")]
    MetadataParse { path: PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to write CSV output: {0}")]
    CsvWrite(String),
}
