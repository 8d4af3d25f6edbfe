use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::AnnotationType;
use crate::error::KiraError;
use crate::table::CsvTable;
use crate::taxon::TaxonRank;

/// Output directory layout.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: &Path) -> Result<Self, KiraError> {
        let root = Utf8PathBuf::from_path_buf(root.to_path_buf())
            .map_err(|_| KiraError::Filesystem("invalid output path".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn count_table_path(&self, annotation_type: AnnotationType) -> Utf8PathBuf {
        self.root
            .join(format!("{annotation_type}_annotations_count_table.csv"))
    }

    pub fn normalized_table_path(&self, annotation_type: AnnotationType) -> Utf8PathBuf {
        self.root
            .join(format!("{annotation_type}_annotations_count_table_norm.csv"))
    }

    pub fn average_table_path(
        &self,
        annotation_type: AnnotationType,
        rank: TaxonRank,
    ) -> Utf8PathBuf {
        self.root
            .join(format!("{annotation_type}_average_by{}.csv", rank.label()))
    }

    pub fn ensure_root(&self) -> Result<(), KiraError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))
    }

    /// Writes `table` to a temp file next to `path`, then moves it into place.
    pub fn write_csv_atomic<T: CsvTable>(path: &Utf8Path, table: &T) -> Result<(), KiraError> {
        let parent = path
            .parent()
            .ok_or_else(|| KiraError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("kira-gc-table")
            .suffix(".csv.tmp")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            table.write_csv(&mut writer)?;
            writer
                .flush()
                .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        }
        temp.persist(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
