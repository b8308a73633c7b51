//! Corrected wind-pressure pipelines for building-surface measurement files.
//!
//! This crate provides tools for:
//! - Parsing whitespace-delimited pressure measurement exports
//! - Correcting mean pressures for pulsation, row by row
//! - Aggregating min/max pressure envelopes across repeated runs
//! - Parallel batch execution with per-file outcome reporting
//!
//! # Example
//!
//! ```no_run
//! use wind_pipeline::config::TerrainCategory;
//! use wind_pipeline::dispatch::{run, CancelToken};
//! use wind_pipeline::request::CorrectionRequest;
//!
//! let request = CorrectionRequest::pulsation(
//!     vec!["building_mean_1.csv".into()],
//!     45.0,
//!     18.0,
//!     TerrainCategory::B,
//!     0.85,
//!     1.2,
//!     "corrected".into(),
//! )
//! .unwrap();
//! let outcome = run(&request, &CancelToken::new());
//! println!("{}", outcome.summary());
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod processors;
pub mod request;

pub use config::{AreaParameters, PipelineConfig, TerrainCategory, WindRegion};
pub use dispatch::{BatchOutcome, CancelToken, FileOutcome, FileReport};
pub use request::{CorrectionRequest, MeasurementFile, Mode, ValidationError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
