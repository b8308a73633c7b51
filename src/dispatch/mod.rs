//! Batch orchestration: parallel fan-out, the aggregation barrier, and
//! run reporting.
//!
//! Files inside one batch are independent, so a failed file never stops
//! its siblings. The peak pipeline is the exception: aggregation pairs
//! rows across files and therefore runs only after every input has been
//! normalized successfully.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use rayon::prelude::*;

use crate::processors::{normalize, peak, pulsation};
use crate::request::{CorrectionRequest, Mode};

/// Shared flag polled between files to stop a batch early.
///
/// Cancellation is cooperative: a file already being processed runs to
/// completion, files not yet started are reported as skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of any batch holding a clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Result of one unit of work within a batch.
#[derive(Debug)]
pub enum FileOutcome {
    /// Processing finished and the named file was written.
    Written(PathBuf),
    /// Processing failed; the error chain carries the file context.
    Failed(anyhow::Error),
    /// The work was never attempted, because the batch was cancelled or
    /// a prerequisite stage did not complete.
    Skipped,
}

/// Pairs an input path with what happened to it.
#[derive(Debug)]
pub struct FileReport {
    pub input: PathBuf,
    pub outcome: FileOutcome,
}

/// Everything a caller needs to report a finished run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Mode of the request that produced this outcome.
    pub mode: Mode,
    /// Per-input reports, in request order.
    pub files: Vec<FileReport>,
    /// Outcome of the cross-file aggregation stage; `None` for
    /// pulsation runs, which have no such stage.
    pub aggregate: Option<FileOutcome>,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

impl BatchOutcome {
    /// Number of inputs whose output was written.
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Written(_)))
    }

    /// Number of inputs that failed.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed(_)))
    }

    /// Number of inputs never attempted.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped))
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// True when every file and every stage of the run succeeded.
    pub fn is_success(&self) -> bool {
        self.written() == self.files.len()
            && !matches!(
                self.aggregate,
                Some(FileOutcome::Failed(_)) | Some(FileOutcome::Skipped)
            )
    }

    /// One-line run report.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} written, {} failed, {} skipped in {:.2?}",
            self.mode,
            self.written(),
            self.failed(),
            self.skipped(),
            self.elapsed
        )
    }
}

/// Run a validated request to completion and report per-file outcomes.
///
/// Mean requests apply the pulsation correction to every file in
/// parallel. Min and max requests normalize every file in place, then
/// aggregate across them once the whole normalization stage has
/// succeeded. The token is polled before each file.
pub fn run(request: &CorrectionRequest, token: &CancelToken) -> BatchOutcome {
    let start = Instant::now();
    let (files, aggregate) = match request.mode() {
        Mode::Mean => (run_pulsation(request, token), None),
        Mode::Min | Mode::Max => run_peak(request, token),
    };

    let outcome = BatchOutcome {
        mode: request.mode(),
        files,
        aggregate,
        elapsed: start.elapsed(),
    };
    info!("{}", outcome.summary());
    outcome
}

fn run_pulsation(request: &CorrectionRequest, token: &CancelToken) -> Vec<FileReport> {
    let ctx = request.context();
    request
        .files()
        .par_iter()
        .map(|file| {
            let outcome = if token.is_cancelled() {
                FileOutcome::Skipped
            } else {
                match pulsation::process_pulsation_file(file.path(), request.output_dir(), &ctx) {
                    Ok(path) => FileOutcome::Written(path),
                    Err(err) => {
                        warn!("{}: {err:#}", file.name());
                        FileOutcome::Failed(err)
                    }
                }
            };
            FileReport {
                input: file.path().to_path_buf(),
                outcome,
            }
        })
        .collect()
}

fn run_peak(
    request: &CorrectionRequest,
    token: &CancelToken,
) -> (Vec<FileReport>, Option<FileOutcome>) {
    let files: Vec<FileReport> = request
        .files()
        .par_iter()
        .map(|file| {
            let outcome = if token.is_cancelled() {
                FileOutcome::Skipped
            } else {
                match normalize::normalize_file(file.path()) {
                    Ok(()) => FileOutcome::Written(file.path().to_path_buf()),
                    Err(err) => {
                        warn!("{}: {err:#}", file.name());
                        FileOutcome::Failed(err)
                    }
                }
            };
            FileReport {
                input: file.path().to_path_buf(),
                outcome,
            }
        })
        .collect();

    // Aggregation pairs row N across every file, so it must not start
    // unless the whole normalization stage completed.
    let ready = files
        .iter()
        .all(|r| matches!(r.outcome, FileOutcome::Written(_)));
    if !ready || token.is_cancelled() {
        warn!("aggregation skipped");
        return (files, Some(FileOutcome::Skipped));
    }

    let ctx = request.context();
    let inputs: Vec<PathBuf> = request
        .files()
        .iter()
        .map(|f| f.path().to_path_buf())
        .collect();
    let aggregate = match peak::aggregate_peaks(&inputs, request.mode(), request.output_dir(), &ctx)
    {
        Ok(path) => FileOutcome::Written(path),
        Err(err) => {
            warn!("aggregation: {err:#}");
            FileOutcome::Failed(err)
        }
    };
    (files, Some(aggregate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainCategory;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn mean_request(files: Vec<PathBuf>, output_dir: PathBuf) -> CorrectionRequest {
        CorrectionRequest::pulsation(files, 50.0, 10.0, TerrainCategory::A, 0.85, 1.2, output_dir)
            .unwrap()
    }

    fn peak_request(files: Vec<PathBuf>, output_dir: PathBuf) -> CorrectionRequest {
        CorrectionRequest::peak(files, 50.0, 10.0, TerrainCategory::A, 1.0, output_dir).unwrap()
    }

    #[test]
    fn test_run_pulsation_batch() {
        init_logs();
        let dir = TempDir::new().unwrap();
        let a = write_file(
            dir.path(),
            "alpha_mean_1.csv",
            "Mean\tX\tY\tZ\n10.0\t0.0\t0.0\t5.0\n",
        );
        let b = write_file(
            dir.path(),
            "beta_mean_1.csv",
            "Mean\tX\tY\tZ\n20.0\t1.0\t0.0\t15.0\n",
        );
        let request = mean_request(vec![a, b], dir.path().to_path_buf());

        let outcome = run(&request, &CancelToken::new());

        assert_eq!(outcome.mode, Mode::Mean);
        assert_eq!(outcome.written(), 2);
        assert_eq!(outcome.failed(), 0);
        assert!(outcome.aggregate.is_none());
        assert!(outcome.is_success());
        assert!(dir.path().join("alpha_puls.csv").exists());
        assert!(dir.path().join("beta_puls.csv").exists());
        assert!(outcome.summary().starts_with("mean: 2 written"));
    }

    #[test]
    fn test_run_pulsation_isolates_failures() {
        init_logs();
        let dir = TempDir::new().unwrap();
        let good = write_file(
            dir.path(),
            "good_mean_1.csv",
            "Mean\tX\tY\tZ\n10.0\t0.0\t0.0\t5.0\n",
        );
        let bad = write_file(
            dir.path(),
            "bad_mean_1.csv",
            "Mean\tX\tY\tZ\nnope\t0.0\t0.0\t5.0\n",
        );
        let request = mean_request(vec![good, bad], dir.path().to_path_buf());

        let outcome = run(&request, &CancelToken::new());

        assert_eq!(outcome.written(), 1);
        assert_eq!(outcome.failed(), 1);
        assert!(!outcome.is_success());
        assert!(dir.path().join("good_puls.csv").exists());
        assert!(!dir.path().join("bad_puls.csv").exists());
        // Reports keep request order.
        assert!(matches!(outcome.files[0].outcome, FileOutcome::Written(_)));
        assert!(matches!(outcome.files[1].outcome, FileOutcome::Failed(_)));
    }

    #[test]
    fn test_run_peak_batch() {
        init_logs();
        let dir = TempDir::new().unwrap();
        let a = write_file(
            dir.path(),
            "tower_max_1.csv",
            "Max\tX(m)\tY(m)\tZ(m)\n5.0\t2.0\t0.0\t1.0\n9.0\t1.0\t0.0\t1.0\n",
        );
        let b = write_file(
            dir.path(),
            "tower_max_2.csv",
            "Max\tX(m)\tY(m)\tZ(m)\n4.0\t1.0\t0.0\t1.0\n6.0\t2.0\t0.0\t1.0\n",
        );
        let request = peak_request(vec![a.clone(), b], dir.path().to_path_buf());

        let outcome = run(&request, &CancelToken::new());

        assert_eq!(outcome.mode, Mode::Max);
        assert_eq!(outcome.written(), 2);
        assert!(matches!(outcome.aggregate, Some(FileOutcome::Written(_))));
        assert!(outcome.is_success());
        // Stage 1 rewrote the inputs sorted by position.
        let normalized = fs::read_to_string(&a).unwrap();
        assert_eq!(
            normalized,
            "Max\tX(m)\tY(m)\tZ(m)\n9.0\t1.0\t0.0\t1.0\n5.0\t2.0\t0.0\t1.0\n"
        );
        let result = fs::read_to_string(dir.path().join("max.csv")).unwrap();
        assert_eq!(result.lines().count(), 3);
    }

    #[test]
    fn test_run_peak_skips_aggregation_on_failure() {
        init_logs();
        let dir = TempDir::new().unwrap();
        let good = write_file(
            dir.path(),
            "tower_min_1.csv",
            "Min\tX\tY\tZ\n1.0\t0.0\t0.0\t1.0\n",
        );
        let bad = write_file(
            dir.path(),
            "tower_min_2.csv",
            "Min\tX\tY\tZ\n1.0\tnope\t0.0\t1.0\n",
        );
        let request = peak_request(vec![good, bad], dir.path().to_path_buf());

        let outcome = run(&request, &CancelToken::new());

        assert_eq!(outcome.written(), 1);
        assert_eq!(outcome.failed(), 1);
        assert!(matches!(outcome.aggregate, Some(FileOutcome::Skipped)));
        assert!(!outcome.is_success());
        assert!(!dir.path().join("min.csv").exists());
    }

    #[test]
    fn test_cancelled_run_skips_all_files() {
        init_logs();
        let dir = TempDir::new().unwrap();
        let a = write_file(
            dir.path(),
            "tower_mean_1.csv",
            "Mean\tX\tY\tZ\n1.0\t0.0\t0.0\t1.0\n",
        );
        let request = mean_request(vec![a], dir.path().to_path_buf());

        let token = CancelToken::new();
        token.cancel();
        let outcome = run(&request, &token);

        assert_eq!(outcome.written(), 0);
        assert_eq!(outcome.skipped(), 1);
        assert!(!outcome.is_success());
        assert!(!dir.path().join("tower_puls.csv").exists());
    }

    #[test]
    fn test_cancelled_peak_run_skips_aggregation() {
        init_logs();
        let dir = TempDir::new().unwrap();
        let a = write_file(
            dir.path(),
            "tower_max_1.csv",
            "Max\tX\tY\tZ\n1.0\t0.0\t0.0\t1.0\n",
        );
        let before = fs::read(&a).unwrap();
        let request = peak_request(vec![a.clone()], dir.path().to_path_buf());

        let token = CancelToken::new();
        token.cancel();
        let outcome = run(&request, &token);

        assert_eq!(outcome.skipped(), 1);
        assert!(matches!(outcome.aggregate, Some(FileOutcome::Skipped)));
        // Inputs are untouched when nothing ran.
        assert_eq!(fs::read(&a).unwrap(), before);
        assert!(!dir.path().join("max.csv").exists());
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();

        assert!(clone.is_cancelled());
    }
}
