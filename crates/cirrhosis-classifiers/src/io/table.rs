//! Delimited text reader for the patient dataset.
use std::path::Path;

use crate::error::{ClassifierError, Result};

/// Cell spellings treated as missing values.
pub const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "null", "NULL", "None", "<NA>", "#N/A", "?",
];

pub fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value.trim())
}

/// Parse a cell as a float, mapping missing markers to `None`.
pub fn parse_cell(value: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    if is_missing(value) {
        return Ok(None);
    }
    value.trim().parse::<f64>().map(Some)
}

/// Whether a column holds numbers or free-form categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// A table of string cells as read from disk. No schema is enforced beyond
/// a rectangular shape.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ClassifierError::MissingColumn(name.to_string()))
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[idx].as_str())
    }

    /// Numeric when every non-missing cell parses as a float. A column with
    /// no values at all is reported as numeric so imputation can reject it.
    pub fn column_kind(&self, idx: usize) -> ColumnKind {
        let numeric = self
            .column(idx)
            .filter(|v| !is_missing(v))
            .all(|v| v.trim().parse::<f64>().is_ok());
        if numeric {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    pub fn numeric_column(&self, idx: usize) -> Result<Vec<Option<f64>>> {
        self.column(idx)
            .map(|v| {
                parse_cell(v).map_err(|_| ClassifierError::InvalidValue {
                    column: self.headers[idx].clone(),
                    value: v.to_string(),
                })
            })
            .collect()
    }
}

/// Read a comma (or tab, for `.tsv`) separated file with a header row.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    };

    let file = std::fs::File::open(path).map_err(|e| ClassifierError::io(path, e))?;
    let table = read_table_from_reader(file, delimiter)?;
    log::debug!(
        "Read {} rows x {} columns from {}",
        table.nrows(),
        table.ncols(),
        path.display()
    );
    Ok(table)
}

pub fn read_table_from_reader<R: std::io::Read>(reader: R, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|v| v.to_string()).collect());
    }

    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_rows() {
        let data = "patient_id,bili,sex,stage\n1,1.2,F,4\n2,NA,M,3\n";
        let table = read_table_from_reader(data.as_bytes(), b',').unwrap();
        assert_eq!(table.headers, vec!["patient_id", "bili", "sex", "stage"]);
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.column_kind(1), ColumnKind::Numeric);
        assert_eq!(table.column_kind(2), ColumnKind::Categorical);
        assert_eq!(table.numeric_column(1).unwrap(), vec![Some(1.2), None]);
    }

    #[test]
    fn missing_column_is_reported() {
        let table = read_table_from_reader("a,b\n1,2\n".as_bytes(), b',').unwrap();
        assert!(matches!(
            table.require_column("stage"),
            Err(ClassifierError::MissingColumn(name)) if name == "stage"
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(read_table_from_reader("a,b\n1,2,3\n".as_bytes(), b',').is_err());
    }
}
