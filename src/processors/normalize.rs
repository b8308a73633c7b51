//! Stage-1 peak normalization: sort and canonicalize files in place.
//!
//! Every peak input is rewritten before aggregation so that rows at the
//! same index across files describe the same measurement position.

use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use crate::core::records::{self, canonicalize_scientific, parse_field};
use crate::core::writers;

/// Sort one peak file by position and strip scientific notation, in place.
///
/// Rows are ordered ascending by their numeric (X, Y, Z) key; equal keys
/// keep their relative order. Pressure fields written in scientific
/// notation are truncated to the mantissa. The file is rewritten
/// tab-delimited with the header line carried over verbatim, so running
/// this pass on its own output changes nothing.
pub fn normalize_file(path: &Path) -> Result<()> {
    let records = records::read_records(path)
        .with_context(|| format!("failed to read input file: {}", path.display()))?;

    let mut keyed = Vec::with_capacity(records.rows.len());
    for row in &records.rows {
        let x = parse_field(&records.path, row.line, &row.fields[1])?;
        let y = parse_field(&records.path, row.line, &row.fields[2])?;
        let z = parse_field(&records.path, row.line, &row.fields[3])?;
        keyed.push(((x, y, z), row));
    }
    keyed.sort_by(|a, b| {
        let (ax, ay, az) = a.0;
        let (bx, by, bz) = b.0;
        ax.total_cmp(&bx)
            .then(ay.total_cmp(&by))
            .then(az.total_cmp(&bz))
    });

    let mut lines = Vec::with_capacity(keyed.len() + 1);
    lines.push(records.header.clone());
    for (_, row) in &keyed {
        lines.push(format!(
            "{}\t{}\t{}\t{}",
            canonicalize_scientific(&row.fields[0]),
            row.fields[1],
            row.fields[2],
            row.fields[3]
        ));
    }

    writers::replace_file_lines(path, &lines)
        .with_context(|| format!("failed to rewrite file: {}", path.display()))?;

    debug!("normalized {} ({} rows)", path.display(), keyed.len());
    Ok(())
}
