//! Per-file pulsation correction.
//!
//! Each mean-pressure export is corrected independently: every row's
//! pressure is replaced by the pulsation-corrected value computed at that
//! row's own elevation, while the coordinate text passes through untouched.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::core::formulas::{correct_pulsation, CorrectionContext};
use crate::core::records::{self, parse_field};
use crate::core::writers::{self, PULSATION_DELIMITER};

/// Header row for pulsation output files.
const OUTPUT_HEADER: [&str; 4] = ["Puls", "X(m)", "Y(m)", "Z(m)"];

/// Output file name for `input`: the part of the file name before its
/// first underscore, with `_puls.csv` appended.
///
/// Exports are named like `building_mean_1.csv`, where the leading
/// segment identifies the measurement series. A name without an
/// underscore falls back to its stem.
pub fn output_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let name = input.file_name().and_then(|s| s.to_str()).unwrap_or(stem);
    let base = match name.split_once('_') {
        Some((prefix, _)) => prefix,
        None => stem,
    };
    format!("{base}_puls.csv")
}

/// Correct one mean-pressure file and write `{basename}_puls.csv`.
///
/// Reads every data row, applies the pulsation correction to the pressure
/// using that row's own Z, preserves the X, Y and Z field text, and
/// writes the output file atomically into `output_dir`.
///
/// # Returns
///
/// The path of the written output file.
///
/// # Errors
///
/// Fails if the input cannot be read, a pressure or Z field is not
/// numeric, or the output cannot be written. No output file appears on
/// failure.
pub fn process_pulsation_file(
    input: &Path,
    output_dir: &Path,
    ctx: &CorrectionContext,
) -> Result<PathBuf> {
    let records = records::read_records(input)
        .with_context(|| format!("failed to read input file: {}", input.display()))?;

    let mut rows = Vec::with_capacity(records.rows.len());
    for row in &records.rows {
        let pressure = parse_field(&records.path, row.line, &row.fields[0])?;
        let z = parse_field(&records.path, row.line, &row.fields[3])?;
        let corrected = correct_pulsation(pressure, z, ctx);
        rows.push(vec![
            corrected.to_string(),
            row.fields[1].clone(),
            row.fields[2].clone(),
            row.fields[3].clone(),
        ]);
    }

    let output = output_dir.join(output_name(input));
    writers::write_records(&output, PULSATION_DELIMITER, &OUTPUT_HEADER, &rows)
        .with_context(|| format!("failed to write output file: {}", output.display()))?;

    debug!(
        "{} -> {} ({} rows)",
        input.display(),
        output.display(),
        rows.len()
    );
    Ok(output)
}
