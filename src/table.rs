//! Tab-separated annotation table reading and CSV output helpers.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};

use crate::error::KiraError;

/// Cell values read as missing, matching the default NA set of the
/// dataframe tooling the portal exports are usually consumed with.
const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_null_value(value: &str) -> bool {
    NULL_TOKENS.contains(&value)
}

/// Non-null view of a raw cell.
pub fn non_null(value: &str) -> Option<&str> {
    (!is_null_value(value)).then_some(value)
}

#[derive(Debug, Clone)]
pub struct AnnotationTable {
    path: PathBuf,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl AnnotationTable {
    /// Reads a tab-separated table after discarding `header_skip` leading lines.
    /// A file without a header line, or with a data row wider than its header,
    /// is a parse error.
    pub fn read(path: &Path, header_skip: usize) -> Result<Self, KiraError> {
        let file = File::open(path).map_err(|err| parse_error(path, err))?;
        Self::from_reader(path, BufReader::new(file), header_skip)
    }

    pub fn from_reader<R: BufRead>(
        path: &Path,
        mut reader: R,
        header_skip: usize,
    ) -> Result<Self, KiraError> {
        let mut discarded = String::new();
        for _ in 0..header_skip {
            discarded.clear();
            if reader
                .read_line(&mut discarded)
                .map_err(|err| parse_error(path, err))?
                == 0
            {
                break;
            }
        }

        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|err| parse_error(path, err))?
            .clone();
        if headers.is_empty() {
            return Err(parse_error(path, "no columns to parse from file"));
        }

        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|err| parse_error(path, err))?;
            if record.len() > headers.len() {
                let line = record.position().map(|pos| pos.line()).unwrap_or_default();
                return Err(parse_error(
                    path,
                    format!(
                        "expected {} fields in line {line}, saw {}",
                        headers.len(),
                        record.len()
                    ),
                ));
            }
            records.push(record);
        }

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cells of `column`, `None` for nulls and for rows shorter than the header.
    pub fn column(
        &self,
        column: &str,
    ) -> Result<impl Iterator<Item = Option<&str>> + '_, KiraError> {
        let index = self
            .headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| KiraError::MissingColumn {
                path: self.path.clone(),
                column: column.to_string(),
            })?;
        Ok(self
            .records
            .iter()
            .map(move |record| record.get(index).and_then(non_null)))
    }
}

fn parse_error(path: &Path, err: impl ToString) -> KiraError {
    KiraError::TableParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// A table that can be written as comma-separated text.
pub trait CsvTable {
    fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), KiraError>;
}

/// Non-finite values are written as empty cells.
pub fn format_float(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}

pub(crate) fn csv_error(err: impl ToString) -> KiraError {
    KiraError::CsvWrite(err.to_string())
}
