//! Core data types, formulas, and I/O operations.

pub mod formulas;
pub mod records;
pub mod writers;

pub use formulas::{
    correct_peak, correct_pulsation, resolved_dynamic, CorrectionContext, Decrement, GeometryIndex,
};
pub use records::{read_records, MeasurementRow, RecordError, RecordFile};
pub use writers::{replace_file_lines, write_records, WriteError};
