//! Gene identifier unification, per-portal hit counting, count matrix assembly
//! and column normalization.

use std::io;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::config::AnnotationSpec;
use crate::domain::{AnnotationFile, Portal};
use crate::error::KiraError;
use crate::table::{AnnotationTable, CsvTable, csv_error, format_float};

pub const GENE_ID_COLUMN: &str = "gene_id";

/// Distinct non-null key values in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneIdSet {
    ids: IndexSet<String>,
}

impl GeneIdSet {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn union(&mut self, other: GeneIdSet) {
        self.ids.extend(other.ids);
    }
}

impl FromIterator<String> for GeneIdSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Distinct key values of one file. Any read failure yields an empty set.
pub fn file_gene_ids(file: &AnnotationFile, spec: &AnnotationSpec) -> GeneIdSet {
    let ids = AnnotationTable::read(&file.path, spec.header_skip).and_then(|table| {
        Ok(table
            .column(&spec.key_column)?
            .flatten()
            .map(str::to_string)
            .collect::<GeneIdSet>())
    });
    match ids {
        Ok(ids) => ids,
        Err(err) => {
            warn!(file = %file.file_name, error = %err, "no gene identifiers read");
            GeneIdSet::default()
        }
    }
}

pub fn unify_gene_ids(files: &[AnnotationFile], spec: &AnnotationSpec) -> GeneIdSet {
    let mut all = GeneIdSet::default();
    for file in files {
        all.union(file_gene_ids(file, spec));
    }
    all
}

/// Hit counts of one portal aligned on the global identifier set.
/// Identifiers the file never mentions are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalCounts {
    pub portal: Portal,
    pub counts: IndexMap<String, Option<u64>>,
}

/// Unlike [`file_gene_ids`], a file that cannot be read is an error here.
pub fn count_hits(
    file: &AnnotationFile,
    spec: &AnnotationSpec,
    genes: &GeneIdSet,
) -> Result<PortalCounts, KiraError> {
    let table = AnnotationTable::read(&file.path, spec.header_skip)?;
    let mut hits = IndexMap::<&str, u64>::new();
    for key in table.column(&spec.key_column)?.flatten() {
        *hits.entry(key).or_default() += 1;
    }
    debug!(
        file = %file.file_name,
        portal = %file.portal,
        rows = table.len(),
        distinct = hits.len(),
        "counted annotation hits"
    );

    let counts = genes
        .iter()
        .map(|id| (id.to_string(), hits.get(id).copied()))
        .collect();
    Ok(PortalCounts {
        portal: file.portal.clone(),
        counts,
    })
}

/// Gene x portal hit counts. `columns[p][g]` is the count of `gene_ids[g]`
/// in `portals[p]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMatrix {
    gene_ids: Vec<String>,
    portals: Vec<Portal>,
    columns: Vec<Vec<u64>>,
}

impl CountMatrix {
    /// Outer-joins the per-portal tables on gene identifier in order, then
    /// fills every missing cell with zero.
    pub fn assemble(tables: Vec<PortalCounts>) -> Self {
        let mut rows = IndexMap::<String, Vec<Option<u64>>>::new();
        let mut portals = Vec::with_capacity(tables.len());
        for (position, table) in tables.into_iter().enumerate() {
            for row in rows.values_mut() {
                row.push(None);
            }
            for (gene_id, count) in table.counts {
                let row = rows
                    .entry(gene_id)
                    .or_insert_with(|| vec![None; position + 1]);
                row[position] = count;
            }
            portals.push(table.portal);
        }

        let mut columns = vec![Vec::with_capacity(rows.len()); portals.len()];
        let mut gene_ids = Vec::with_capacity(rows.len());
        for (gene_id, row) in rows {
            for (column, count) in columns.iter_mut().zip(row) {
                column.push(count.unwrap_or(0));
            }
            gene_ids.push(gene_id);
        }

        Self {
            gene_ids,
            portals,
            columns,
        }
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    pub fn column(&self, portal: &str) -> Option<&[u64]> {
        let index = self.portals.iter().position(|p| p.as_str() == portal)?;
        Some(&self.columns[index])
    }

    pub fn get(&self, gene_id: &str, portal: &str) -> Option<u64> {
        let row = self.gene_ids.iter().position(|id| id == gene_id)?;
        self.column(portal).map(|column| column[row])
    }

    /// Rescales every column to sum to `total`. A zero-sum column becomes
    /// all NaN (0/0).
    pub fn normalize(&self, total: f64) -> NormalizedMatrix {
        let columns = self
            .columns
            .iter()
            .zip(&self.portals)
            .map(|(column, portal)| {
                let sum = column.iter().sum::<u64>() as f64;
                if sum == 0.0 {
                    warn!(portal = %portal, "portal has no counted hits, normalized values are undefined");
                }
                column
                    .iter()
                    .map(|&count| count as f64 / sum * total)
                    .collect()
            })
            .collect();
        NormalizedMatrix {
            gene_ids: self.gene_ids.clone(),
            portals: self.portals.clone(),
            columns,
        }
    }
}

impl CsvTable for CountMatrix {
    fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), KiraError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let header = std::iter::once(GENE_ID_COLUMN).chain(self.portals.iter().map(Portal::as_str));
        wtr.write_record(header).map_err(csv_error)?;
        for (row, gene_id) in self.gene_ids.iter().enumerate() {
            let record = std::iter::once(gene_id.clone())
                .chain(self.columns.iter().map(|column| column[row].to_string()));
            wtr.write_record(record).map_err(csv_error)?;
        }
        wtr.flush().map_err(csv_error)
    }
}

/// Column-normalized abundance, same layout as [`CountMatrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMatrix {
    gene_ids: Vec<String>,
    portals: Vec<Portal>,
    columns: Vec<Vec<f64>>,
}

impl NormalizedMatrix {
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    pub fn columns(&self) -> impl Iterator<Item = (&Portal, &[f64])> {
        self.portals
            .iter()
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    pub fn column(&self, portal: &str) -> Option<&[f64]> {
        let index = self.portals.iter().position(|p| p.as_str() == portal)?;
        Some(&self.columns[index])
    }

    pub fn get(&self, gene_id: &str, portal: &str) -> Option<f64> {
        let row = self.gene_ids.iter().position(|id| id == gene_id)?;
        self.column(portal).map(|column| column[row])
    }
}

impl CsvTable for NormalizedMatrix {
    fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), KiraError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let header = std::iter::once(GENE_ID_COLUMN).chain(self.portals.iter().map(Portal::as_str));
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
    use super::*;

    fn counts(portal: &str, values: &[(&str, Option<u64>)]) -> PortalCounts {
        PortalCounts {
            portal: Portal::new(portal),
            counts: values
                .iter()
                .map(|(id, count)| (id.to_string(), *count))
                .collect(),
        }
    }

    #[test]
    fn assemble_outer_joins_and_zero_fills() {
        let matrix = CountMatrix::assemble(vec![
            counts("A", &[("g1", Some(2)), ("g2", None)]),
            counts("B", &[("g2", Some(1)), ("g3", Some(4))]),
        ]);
        assert_eq!(matrix.gene_ids(), &["g1", "g2", "g3"]);
        assert_eq!(matrix.column("A"), Some(&[2, 0, 0][..]));
        assert_eq!(matrix.column("B"), Some(&[0, 1, 4][..]));
    }

    #[test]
    fn normalize_sums_to_total() {
        let matrix = CountMatrix::assemble(vec![counts(
            "A",
            &[("g1", Some(1)), ("g2", Some(2)), ("g3", Some(3))],
        )]);
        let norm = matrix.normalize(10_000.0);
        let sum = norm.column("A").unwrap().iter().sum::<f64>();
        assert!((sum - 10_000.0).abs() < 1e-6);
        assert!((norm.get("g1", "A").unwrap() - 10_000.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn zero_sum_column_is_nan() {
        let matrix = CountMatrix::assemble(vec![
            counts("A", &[("g1", Some(1))]),
            counts("B", &[("g1", None)]),
        ]);
        let norm = matrix.normalize(10_000.0);
        assert!(norm.column("B").unwrap().iter().all(|value| value.is_nan()));
    }

    #[test]
    fn count_matrix_csv() {
        let matrix = CountMatrix::assemble(vec![
            counts("Sp1", &[("1.1.1.1", Some(1))]),
            counts("Sp2", &[("1.1.1.1", Some(3))]),
        ]);
        let mut out = Vec::new();
        matrix.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "gene_id,Sp1,Sp2\n1.1.1.1,1,3\n"
        );
    }
}
