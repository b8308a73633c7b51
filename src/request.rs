//! Correction run requests and their validation.
//!
//! A request captures everything the dispatcher needs for one run: the
//! classified file set, the building parameters, and the output directory.
//! Every check runs at construction, before any task is dispatched, and
//! the request is immutable afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

use crate::config::TerrainCategory;
use crate::core::formulas::CorrectionContext;

/// Errors raised while validating a correction request.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("no input files were selected")]
    NoFiles,

    #[error("building dimensions must be positive finite numbers: H = {height}, W = {width}")]
    InvalidDimensions { height: f64, width: f64 },

    #[error("correlation coefficient {value} is outside 0..=100")]
    CorrelationOutOfRange { value: f64 },

    #[error("dynamic coefficient is unresolved; compute it or mark the natural frequency unknown")]
    UnresolvedDynamic,

    #[error("cannot infer a mode from file name '{name}'")]
    UnknownMode { name: String },

    #[error("file name '{name}' matches more than one mode")]
    AmbiguousMode { name: String },

    #[error("all files in a request must share a mode: '{name}' is {found}, the request is {expected}")]
    MixedModes {
        name: String,
        found: Mode,
        expected: Mode,
    },

    #[error("'{name}' is a {mode} file, which the {pipeline} pipeline does not accept")]
    WrongPipeline {
        name: String,
        mode: Mode,
        pipeline: &'static str,
    },
}

/// Statistic carried by a measurement file, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Mean,
    Min,
    Max,
}

impl Mode {
    /// Lowercase token as it appears in file names.
    pub fn token(self) -> &'static str {
        match self {
            Mode::Mean => "mean",
            Mode::Min => "min",
            Mode::Max => "max",
        }
    }

    /// Capitalized form used in output headers.
    pub fn capitalized(self) -> &'static str {
        match self {
            Mode::Mean => "Mean",
            Mode::Min => "Min",
            Mode::Max => "Max",
        }
    }

    /// Infer the mode from a file's name (not its directory components).
    ///
    /// Matching is case-insensitive. A name that contains tokens of two
    /// different modes is rejected as ambiguous rather than resolved by
    /// position.
    pub fn from_file_name(path: &Path) -> Result<Mode, ValidationError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let pattern = Regex::new(r"(?i)(mean|min|max)").unwrap();

        let mut found: Option<Mode> = None;
        for token in pattern.find_iter(name) {
            let mode = match token.as_str().to_ascii_lowercase().as_str() {
                "mean" => Mode::Mean,
                "min" => Mode::Min,
                _ => Mode::Max,
            };
            match found {
                None => found = Some(mode),
                Some(previous) if previous != mode => {
                    return Err(ValidationError::AmbiguousMode {
                        name: name.to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        found.ok_or_else(|| ValidationError::UnknownMode {
            name: name.to_string(),
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// An input file together with its inferred mode.
#[derive(Debug, Clone)]
pub struct MeasurementFile {
    path: PathBuf,
    mode: Mode,
}

impl MeasurementFile {
    /// Classify a file by its name.
    pub fn from_path(path: PathBuf) -> Result<Self, ValidationError> {
        let mode = Mode::from_file_name(&path)?;
        Ok(Self { path, mode })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// File name for messages and reports.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string()
    }
}

/// A fully validated correction run.
///
/// Constructed through [`CorrectionRequest::pulsation`] or
/// [`CorrectionRequest::peak`]; all fields are private and fixed for the
/// lifetime of the run.
#[derive(Debug, Clone)]
pub struct CorrectionRequest {
    files: Vec<MeasurementFile>,
    mode: Mode,
    height: f64,
    width: f64,
    terrain: TerrainCategory,
    correlation: f64,
    dynamic: f64,
    output_dir: PathBuf,
}

impl CorrectionRequest {
    /// Build a pulsation run over mean-pressure files.
    ///
    /// Every file must classify as `mean`. The dynamic coefficient comes
    /// from [`resolved_dynamic`](crate::core::formulas::resolved_dynamic);
    /// 0.0 means the value was never computed and is rejected here.
    pub fn pulsation(
        files: Vec<PathBuf>,
        height: f64,
        width: f64,
        terrain: TerrainCategory,
        correlation: f64,
        dynamic: f64,
        output_dir: PathBuf,
    ) -> Result<Self, ValidationError> {
        let files = classify_files(files, "pulsation", |mode| mode == Mode::Mean)?;
        check_dimensions(height, width)?;
        check_correlation(correlation)?;
        if dynamic == 0.0 || !dynamic.is_finite() {
            return Err(ValidationError::UnresolvedDynamic);
        }

        Ok(Self {
            files,
            mode: Mode::Mean,
            height,
            width,
            terrain,
            correlation,
            dynamic,
            output_dir,
        })
    }

    /// Build a peak run over min- or max-pressure files.
    ///
    /// Every file must classify as `min` or `max`, and all files must
    /// agree. The peak formula carries no dynamic coefficient, so it is
    /// fixed at 1.0 here.
    pub fn peak(
        files: Vec<PathBuf>,
        height: f64,
        width: f64,
        terrain: TerrainCategory,
        correlation: f64,
        output_dir: PathBuf,
    ) -> Result<Self, ValidationError> {
        let files = classify_files(files, "peak", |mode| mode != Mode::Mean)?;
        check_dimensions(height, width)?;
        check_correlation(correlation)?;
        let mode = files[0].mode();

        Ok(Self {
            files,
            mode,
            height,
            width,
            terrain,
            correlation,
            dynamic: 1.0,
            output_dir,
        })
    }

    /// Build the shared correction context for this run.
    ///
    /// The geometry index is classified here, once; nothing downstream
    /// re-derives it.
    pub fn context(&self) -> CorrectionContext {
        CorrectionContext::new(
            self.height,
            self.width,
            self.terrain.parameters(),
            self.correlation,
            self.dynamic,
        )
    }

    pub fn files(&self) -> &[MeasurementFile] {
        &self.files
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn terrain(&self) -> TerrainCategory {
        self.terrain
    }

    pub fn correlation(&self) -> f64 {
        self.correlation
    }

    pub fn dynamic(&self) -> f64 {
        self.dynamic
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Classify every path and require a single mode accepted by `accepts`.
fn classify_files(
    paths: Vec<PathBuf>,
    pipeline: &'static str,
    accepts: impl Fn(Mode) -> bool,
) -> Result<Vec<MeasurementFile>, ValidationError> {
    if paths.is_empty() {
        return Err(ValidationError::NoFiles);
    }

    let mut files = Vec::with_capacity(paths.len());
    let mut expected: Option<Mode> = None;
    for path in paths {
        let file = MeasurementFile::from_path(path)?;
        if !accepts(file.mode()) {
            return Err(ValidationError::WrongPipeline {
                name: file.name(),
                mode: file.mode(),
                pipeline,
            });
        }
        match expected {
            None => expected = Some(file.mode()),
            Some(mode) if file.mode() != mode => {
                return Err(ValidationError::MixedModes {
                    name: file.name(),
                    found: file.mode(),
                    expected: mode,
                })
            }
            Some(_) => {}
        }
        files.push(file);
    }
    Ok(files)
}

fn check_dimensions(height: f64, width: f64) -> Result<(), ValidationError> {
    let valid = height.is_finite() && width.is_finite() && height > 0.0 && width > 0.0;
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidDimensions { height, width })
    }
}

fn check_correlation(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::CorrelationOutOfRange { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formulas::GeometryIndex;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_mode_inference() {
        assert_eq!(
            Mode::from_file_name(Path::new("building_mean_1.csv")).unwrap(),
            Mode::Mean
        );
        assert_eq!(
            Mode::from_file_name(Path::new("tower_MAX_export.csv")).unwrap(),
            Mode::Max
        );
        assert_eq!(
            Mode::from_file_name(Path::new("roof min.csv")).unwrap(),
            Mode::Min
        );
    }

    #[test]
    fn test_mode_inference_ignores_directories() {
        // A parent directory must not leak into classification.
        let path = Path::new("/data/max_runs/building_mean_1.csv");
        assert_eq!(Mode::from_file_name(path).unwrap(), Mode::Mean);
    }

    #[test]
    fn test_mode_inference_rejects_unknown_and_ambiguous() {
        assert!(matches!(
            Mode::from_file_name(Path::new("pressures.csv")),
            Err(ValidationError::UnknownMode { .. })
        ));
        assert!(matches!(
            Mode::from_file_name(Path::new("min_and_max.csv")),
            Err(ValidationError::AmbiguousMode { .. })
        ));
    }

    #[test]
    fn test_mode_repeated_token_is_not_ambiguous() {
        assert_eq!(
            Mode::from_file_name(Path::new("max_of_max.csv")).unwrap(),
            Mode::Max
        );
    }

    #[test]
    fn test_pulsation_request_valid() {
        let request = CorrectionRequest::pulsation(
            paths(&["a_mean_1.csv", "b_mean_2.csv"]),
            50.0,
            10.0,
            TerrainCategory::A,
            0.85,
            1.2,
            PathBuf::from("/tmp/out"),
        )
        .unwrap();

        assert_eq!(request.mode(), Mode::Mean);
        assert_eq!(request.files().len(), 2);
        assert_eq!(request.context().index, GeometryIndex::Slender);
    }

    #[test]
    fn test_pulsation_rejects_peak_files() {
        let result = CorrectionRequest::pulsation(
            paths(&["a_mean_1.csv", "b_max_1.csv"]),
            50.0,
            10.0,
            TerrainCategory::A,
            0.85,
            1.2,
            PathBuf::from("/tmp/out"),
        );

        assert!(matches!(
            result,
            Err(ValidationError::WrongPipeline { pipeline: "pulsation", .. })
        ));
    }

    #[test]
    fn test_pulsation_rejects_unresolved_dynamic() {
        let result = CorrectionRequest::pulsation(
            paths(&["a_mean_1.csv"]),
            50.0,
            10.0,
            TerrainCategory::A,
            0.85,
            0.0,
            PathBuf::from("/tmp/out"),
        );

        assert!(matches!(result, Err(ValidationError::UnresolvedDynamic)));
    }

    #[test]
    fn test_peak_request_uses_first_file_mode() {
        let request = CorrectionRequest::peak(
            paths(&["a_min_1.csv", "b_min_2.csv"]),
            20.0,
            10.0,
            TerrainCategory::B,
            1.0,
            PathBuf::from("/tmp/out"),
        )
        .unwrap();

        assert_eq!(request.mode(), Mode::Min);
        assert_eq!(request.dynamic(), 1.0);
    }

    #[test]
    fn test_peak_rejects_mixed_min_max() {
        let result = CorrectionRequest::peak(
            paths(&["a_min_1.csv", "b_max_2.csv"]),
            20.0,
            10.0,
            TerrainCategory::B,
            1.0,
            PathBuf::from("/tmp/out"),
        );

        assert!(matches!(result, Err(ValidationError::MixedModes { .. })));
    }

    #[test]
    fn test_peak_rejects_mean_files() {
        let result = CorrectionRequest::peak(
            paths(&["a_mean_1.csv"]),
            20.0,
            10.0,
            TerrainCategory::B,
            1.0,
            PathBuf::from("/tmp/out"),
        );

        assert!(matches!(
            result,
            Err(ValidationError::WrongPipeline { pipeline: "peak", .. })
        ));
    }

    #[test]
    fn test_empty_file_list_rejected() {
        let result = CorrectionRequest::peak(
            Vec::new(),
            20.0,
            10.0,
            TerrainCategory::A,
            1.0,
            PathBuf::from("/tmp/out"),
        );

        assert!(matches!(result, Err(ValidationError::NoFiles)));
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        let result = CorrectionRequest::pulsation(
            paths(&["a_mean_1.csv"]),
            0.0,
            10.0,
            TerrainCategory::A,
            0.85,
            1.0,
            PathBuf::from("/tmp/out"),
        );

        assert!(matches!(result, Err(ValidationError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_correlation_range_enforced() {
        let result = CorrectionRequest::pulsation(
            paths(&["a_mean_1.csv"]),
            50.0,
            10.0,
            TerrainCategory::A,
            100.5,
            1.0,
            PathBuf::from("/tmp/out"),
        );

        assert!(matches!(
            result,
            Err(ValidationError::CorrelationOutOfRange { .. })
        ));
    }
}
