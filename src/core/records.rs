//! Readers for measurement record files.
//!
//! Input files carry a header line followed by rows of four numeric fields
//! (pressure, X, Y, Z). Exports arrive tab- or space-delimited depending on
//! the producing tool, so rows are split on any run of whitespace. Rows that
//! repeat the header token are dropped wherever records are read;
//! concatenated exports insert the header line between blocks.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Number of fields in a measurement row: pressure, X, Y, Z.
pub const FIELD_COUNT: usize = 4;

/// Errors that can occur while reading measurement files.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("{path}:{line}: expected 4 fields, found {found}")]
    MalformedRow {
        path: String,
        line: usize,
        found: usize,
    },

    #[error("{path}:{line}: invalid numeric field '{field}'")]
    InvalidNumber {
        path: String,
        line: usize,
        field: String,
    },
}

/// Result type for record reading operations.
pub type Result<T> = std::result::Result<T, RecordError>;

/// One measurement row with all four fields parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRow {
    pub pressure: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One measurement row with the original field text preserved.
///
/// The pulsation output keeps X, Y and Z exactly as they appear in the
/// input, so the raw text is carried alongside the source line number.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line number in the source file.
    pub line: usize,
    /// Field text in file order: pressure, X, Y, Z.
    pub fields: [String; 4],
}

/// A measurement file split into its header line and raw data rows.
#[derive(Debug, Clone)]
pub struct RecordFile {
    pub path: PathBuf,
    /// The header line, byte-for-byte as read.
    pub header: String,
    pub rows: Vec<RawRow>,
}

impl RecordFile {
    /// Parse every row into numeric form, in file order.
    pub fn measurements(&self) -> Result<Vec<MeasurementRow>> {
        self.rows
            .iter()
            .map(|row| {
                Ok(MeasurementRow {
                    pressure: parse_field(&self.path, row.line, &row.fields[0])?,
                    x: parse_field(&self.path, row.line, &row.fields[1])?,
                    y: parse_field(&self.path, row.line, &row.fields[2])?,
                    z: parse_field(&self.path, row.line, &row.fields[3])?,
                })
            })
            .collect()
    }
}

/// Parse one field as `f64`, reporting the file position on failure.
pub fn parse_field(path: &Path, line: usize, field: &str) -> Result<f64> {
    field
        .parse()
        .map_err(|_| RecordError::InvalidNumber {
            path: path.display().to_string(),
            line,
            field: field.to_string(),
        })
}

/// Strip the exponent from a field in scientific notation.
///
/// `1.23e-05` becomes `1.23`; fields without an exponent marker pass
/// through unchanged. The truncation keeps only the mantissa text, it does
/// not apply the exponent.
pub fn canonicalize_scientific(field: &str) -> &str {
    match field.find(|c| c == 'e' || c == 'E') {
        Some(pos) => &field[..pos],
        None => field,
    }
}

/// Read a measurement file into a header line and whitespace-split rows.
///
/// Blank lines are skipped. A data row whose first field begins with the
/// first header token is dropped. Any remaining row must have exactly four
/// fields.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is completely empty, or
/// contains a row with the wrong field count.
pub fn read_records(path: &Path) -> Result<RecordFile> {
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(64 * 1024, file);

    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(RecordError::EmptyFile(path.to_path_buf())),
    };
    let header_token = header.split_whitespace().next().unwrap_or("").to_string();

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line?;
        let line_number = index + 2; // 1-based, counting the header as line 1

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if !header_token.is_empty() && fields[0].starts_with(&header_token) {
            continue;
        }
        if fields.len() != FIELD_COUNT {
            return Err(RecordError::MalformedRow {
                path: path.display().to_string(),
                line: line_number,
                found: fields.len(),
            });
        }

        rows.push(RawRow {
            line: line_number,
            fields: [
                fields[0].to_string(),
                fields[1].to_string(),
                fields[2].to_string(),
                fields[3].to_string(),
            ],
        });
    }

    Ok(RecordFile {
        path: path.to_path_buf(),
        header,
        rows,
    })
}
