//! Portal taxonomy metadata and per-genus / per-species averaging.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::KiraError;
use crate::matrix::{GENE_ID_COLUMN, NormalizedMatrix};
use crate::table::{CsvTable, csv_error, format_float, non_null};

pub const REQUIRED_METADATA_COLUMNS: [&str; 3] = ["portal", "genus", "species"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonRank {
    Species,
    Genus,
}

impl TaxonRank {
    pub const ALL: [TaxonRank; 2] = [TaxonRank::Species, TaxonRank::Genus];

    /// Suffix used in output file names.
    pub fn label(&self) -> &'static str {
        match self {
            TaxonRank::Species => "Species",
            TaxonRank::Genus => "Genus",
        }
    }
}

impl fmt::Display for TaxonRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonRank::Species => write!(f, "species"),
            TaxonRank::Genus => write!(f, "genus"),
        }
    }
}

/// Cells missing from a short row deserialize as empty, i.e. null.
#[derive(Debug, Deserialize)]
struct MetadataRow {
    #[serde(default)]
    portal: String,
    #[serde(default)]
    genus: String,
    #[serde(default)]
    species: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub portal: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
}

impl From<MetadataRow> for MetadataRecord {
    fn from(row: MetadataRow) -> Self {
        Self {
            portal: non_null(&row.portal).map(str::to_string),
            genus: non_null(&row.genus).map(str::to_string),
            species: non_null(&row.species).map(|species| species.replace(' ', "_")),
        }
    }
}

/// Portal -> genus/species reference table.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    records: Vec<MetadataRecord>,
}

impl Metadata {
    pub fn load(path: &Path) -> Result<Self, KiraError> {
        let file = File::open(path).map_err(|err| KiraError::MetadataParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_reader(path, file)
    }

    pub fn from_reader<R: io::Read>(path: &Path, reader: R) -> Result<Self, KiraError> {
        let parse_error = |err: csv::Error| KiraError::MetadataParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .flexible(true)
            .from_reader(reader);
        let headers = rdr.headers().map_err(parse_error)?.clone();
        for column in REQUIRED_METADATA_COLUMNS {
            if !headers.iter().any(|header| header == column) {
                return Err(KiraError::MetadataColumn(column.to_string()));
            }
        }

        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(parse_error)?;
            if record.len() > headers.len() {
                let line = record.position().map(|pos| pos.line()).unwrap_or_default();
                return Err(KiraError::MetadataParse {
                    path: path.to_path_buf(),
                    message: format!(
                        "expected {} fields in line {line}, saw {}",
                        headers.len(),
                        record.len()
                    ),
                });
            }
            let row = record
                .deserialize::<MetadataRow>(Some(&headers))
                .map_err(parse_error)?;
            records.push(MetadataRecord::from(row));
        }
        debug!(path = %path.display(), records = records.len(), "loaded metadata");
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Taxon of the first record for `portal`. `None` when the portal is
    /// unknown or its taxon cell is null.
    pub fn taxon(&self, portal: &str, rank: TaxonRank) -> Option<&str> {
        let record = self
            .records
            .iter()
            .find(|record| record.portal.as_deref() == Some(portal))?;
        match rank {
            TaxonRank::Genus => record.genus.as_deref(),
            TaxonRank::Species => record.species.as_deref(),
        }
    }
}

/// Gene x taxon mean abundance, groups in sorted order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonAverage {
    gene_ids: Vec<String>,
    groups: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl TaxonAverage {
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn column(&self, group: &str) -> Option<&[f64]> {
        let index = self.groups.iter().position(|g| g == group)?;
        Some(&self.columns[index])
    }

    pub fn get(&self, gene_id: &str, group: &str) -> Option<f64> {
        let row = self.gene_ids.iter().position(|id| id == gene_id)?;
        self.column(group).map(|column| column[row])
    }
}

/// Averages normalized portal columns within each taxon of `rank`. Portals
/// without a taxon are left out; NaN cells are skipped in the mean.
pub fn average_by_taxon(
    matrix: &NormalizedMatrix,
    metadata: &Metadata,
    rank: TaxonRank,
) -> TaxonAverage {
    let mut members = BTreeMap::<String, Vec<&[f64]>>::new();
    for (portal, column) in matrix.columns() {
        match metadata.taxon(portal.as_str(), rank) {
            Some(taxon) => members.entry(taxon.to_string()).or_default().push(column),
            None => debug!(portal = %portal, rank = %rank, "portal has no taxon, excluded"),
        }
    }

    let rows = matrix.gene_ids().len();
    let mut groups = Vec::with_capacity(members.len());
    let mut columns = Vec::with_capacity(members.len());
    for (taxon, portal_columns) in members {
        let column = (0..rows)
            .map(|row| nan_mean(portal_columns.iter().map(|column| column[row])))
            .collect();
        groups.push(taxon);
        columns.push(column);
    }

    TaxonAverage {
        gene_ids: matrix.gene_ids().to_vec(),
        groups,
        columns,
    }
}

fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|value| !value.is_nan())
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

impl CsvTable for TaxonAverage {
    fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), KiraError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let header = std::iter::once(GENE_ID_COLUMN).chain(self.groups.iter().map(String::as_str));
        wtr.write_record(header).map_err(csv_error)?;
        for (row, gene_id) in self.gene_ids.iter().enumerate() {
            let record = std::iter::once(gene_id.clone())
                .chain(self.columns.iter().map(|column| format_float(column[row])));
            wtr.write_record(record).map_err(csv_error)?;
        }
        wtr.flush().map_err(csv_error)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn metadata(content: &str) -> Result<Metadata, KiraError> {
        Metadata::from_reader(Path::new("meta.csv"), content.as_bytes())
    }

    #[test]
    fn species_spaces_become_underscores() {
        let meta = metadata("portal,genus,species,notes\nSp1,Aspergillus,Aspergillus niger,x\n")
            .unwrap();
        assert_eq!(
            meta.taxon("Sp1", TaxonRank::Species),
            Some("Aspergillus_niger")
        );
        assert_eq!(meta.taxon("Sp1", TaxonRank::Genus), Some("Aspergillus"));
        assert_eq!(meta.taxon("Sp9", TaxonRank::Genus), None);
    }

    #[test]
    fn missing_required_column() {
        let err = metadata("portal,genus\nSp1,Aspergillus\n").unwrap_err();
        assert_matches!(err, KiraError::MetadataColumn(column) if column == "species");
    }

    #[test]
    fn first_record_wins() {
        let meta = metadata("portal,genus,species\nSp1,A,a x\nSp1,B,b y\n").unwrap();
        assert_eq!(meta.taxon("Sp1", TaxonRank::Genus), Some("A"));
    }

    #[test]
    fn null_taxon_is_none() {
        let meta = metadata("portal,genus,species\nSp1,,NA\n").unwrap();
        assert_eq!(meta.taxon("Sp1", TaxonRank::Genus), None);
        assert_eq!(meta.taxon("Sp1", TaxonRank::Species), None);
    }

    #[test]
    fn nan_mean_skips_nan() {
        assert_eq!(nan_mean([1.0, f64::NAN, 3.0].into_iter()), 2.0);
        assert!(nan_mean([f64::NAN].into_iter()).is_nan());
    }
}
