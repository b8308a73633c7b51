//! Pipeline passes.

pub mod normalize;
pub mod peak;
pub mod pulsation;

// Re-export key entry points for convenience
pub use normalize::normalize_file;
pub use peak::{aggregate_peaks, AggregationError};
pub use pulsation::process_pulsation_file;
