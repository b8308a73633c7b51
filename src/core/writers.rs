//! Writers for corrected record files.
//!
//! Output always goes through a staging file beside the destination which is
//! renamed into place after a successful flush, so a failed or cancelled run
//! never leaves a partially written file where a consumer could pick it up.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Field delimiter for pulsation output files.
pub const PULSATION_DELIMITER: u8 = b' ';

/// Field delimiter for peak output and normalized intermediate files.
pub const PEAK_DELIMITER: u8 = b'\t';

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the staging file.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to the staging file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Failed to move the staging file into place.
    #[error("failed to move '{temp}' into place at '{path}': {source}")]
    Rename {
        temp: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Staging path for `path`: the same file name with `.tmp` appended.
///
/// Staying in the destination directory keeps the final rename on one
/// filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write a delimited record file with a header row, atomically.
///
/// Rows are staged into `<name>.tmp` beside the destination and renamed
/// into place after a successful flush. On any error the staging file is
/// removed and the destination is left untouched.
///
/// # Arguments
///
/// * `path` - Destination file path (parent directories are created)
/// * `delimiter` - Field delimiter byte, [`PULSATION_DELIMITER`] or
///   [`PEAK_DELIMITER`]
/// * `header` - Header fields written as the first record
/// * `rows` - Data rows, one record each
pub fn write_records(
    path: &Path,
    delimiter: u8,
    header: &[&str],
    rows: &[Vec<String>],
) -> Result<()> {
    ensure_parent_dirs(path)?;
    let temp = temp_path(path);

    let result = write_records_to(&temp, delimiter, header, rows).and_then(|()| {
        fs::rename(&temp, path).map_err(|e| WriteError::Rename {
            temp: temp.display().to_string(),
            path: path.display().to_string(),
            source: e,
        })
    });

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn write_records_to(
    temp: &Path,
    delimiter: u8,
    header: &[&str],
    rows: &[Vec<String>],
) -> Result<()> {
    let file = File::create(temp).map_err(|e| WriteError::CreateFile {
        path: temp.display().to_string(),
        source: e,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(BufWriter::new(file));

    let path_str = temp.display().to_string();

    writer.write_record(header).map_err(|e| WriteError::Csv {
        path: path_str.clone(),
        source: e,
    })?;

    for row in rows {
        writer.write_record(row).map_err(|e| WriteError::Csv {
            path: path_str.clone(),
            source: e,
        })?;
    }

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Rewrite `path` with the given lines, staging to a temp file first.
///
/// Used by the normalize pass, which replaces a file with a transformed
/// copy of itself. Each line is written verbatim with a trailing newline.
pub fn replace_file_lines(path: &Path, lines: &[String]) -> Result<()> {
    let temp = temp_path(path);

    let result = write_lines_to(&temp, lines).and_then(|()| {
        fs::rename(&temp, path).map_err(|e| WriteError::Rename {
            temp: temp.display().to_string(),
            path: path.display().to_string(),
            source: e,
        })
    });

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn write_lines_to(temp: &Path, lines: &[String]) -> Result<()> {
    let file = File::create(temp).map_err(|e| WriteError::CreateFile {
        path: temp.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let path_str = temp.display().to_string();

    for line in lines {
        writeln!(writer, "{}", line).map_err(|e| WriteError::WriteFile {
            path: path_str.clone(),
            source: e,
        })?;
    }

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}
