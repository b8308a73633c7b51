//! Stage-2 peak aggregation across normalized files.
//!
//! After normalization, row N of every input describes the same
//! measurement position, so the envelope reduces across files one row
//! index at a time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use rayon::prelude::*;
use thiserror::Error;

use crate::core::formulas::{correct_peak, CorrectionContext};
use crate::core::records::{self, MeasurementRow};
use crate::core::writers::{self, PEAK_DELIMITER};
use crate::request::Mode;

/// Errors specific to cross-file aggregation.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("no files to aggregate")]
    NoFiles,

    #[error("row count mismatch in '{path}': found {found} rows, expected {expected}")]
    RowCountMismatch {
        path: String,
        expected: usize,
        found: usize,
    },
}

/// Select the min or max pressure per position across files, correct it,
/// and write `{mode}.csv` into `output_dir`.
///
/// All inputs must carry the same row count; equal pressures keep the row
/// from the earliest file in `inputs` order. Each selected row's pressure
/// is corrected with the peak formula at that row's Z before writing. The
/// output is tab-delimited, one row per position, in position order.
///
/// # Returns
///
/// The path of the written output file.
pub fn aggregate_peaks(
    inputs: &[PathBuf],
    mode: Mode,
    output_dir: &Path,
    ctx: &CorrectionContext,
) -> Result<PathBuf> {
    if inputs.is_empty() {
        return Err(AggregationError::NoFiles.into());
    }

    // Load every table up front; row counts must agree before any
    // position can be paired across files.
    let mut tables: Vec<Vec<MeasurementRow>> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let records = records::read_records(input)
            .with_context(|| format!("failed to read input file: {}", input.display()))?;
        tables.push(records.measurements()?);
    }

    let expected = tables[0].len();
    for (input, table) in inputs.iter().zip(&tables).skip(1) {
        if table.len() != expected {
            return Err(AggregationError::RowCountMismatch {
                path: input.display().to_string(),
                expected,
                found: table.len(),
            }
            .into());
        }
    }

    let minimize = mode == Mode::Min;
    let rows: Vec<Vec<String>> = (0..expected)
        .into_par_iter()
        .map(|position| {
            let mut selected = &tables[0][position];
            for table in &tables[1..] {
                let candidate = &table[position];
                let better = if minimize {
                    candidate.pressure < selected.pressure
                } else {
                    candidate.pressure > selected.pressure
                };
                if better {
                    selected = candidate;
                }
            }
            let corrected = correct_peak(selected.pressure, selected.z, ctx);
            vec![
                corrected.to_string(),
                selected.x.to_string(),
                selected.y.to_string(),
                selected.z.to_string(),
            ]
        })
        .collect();

    let output = output_dir.join(format!("{}.csv", mode.token()));
    let header = [mode.capitalized(), "X(m)", "Y(m)", "Z(m)"];
    writers::write_records(&output, PEAK_DELIMITER, &header, &rows)
        .with_context(|| format!("failed to write output file: {}", output.display()))?;

    debug!(
        "aggregated {} files -> {} ({} rows)",
        inputs.len(),
        output.display(),
        rows.len()
    );
    Ok(output)
}
