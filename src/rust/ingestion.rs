//! Ingestion stage: train the submitted model and persist its predictions.
//!
//! Every step is a free function taking what it needs and returning what it
//! produces; [`run`] threads the values through in order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::artifacts::{self, IngestionDuration, IngestionResult, PredictionMap, DURATION_FILE, RESULT_FILE};
use crate::dataset::{self, Dataset, LoadedData};
use crate::error::Result;
use crate::model::{Model, ModelError};

/// Wall-clock timer recorded as plain values.
///
/// `start` and `stop` consume the timer and return an updated copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    started: Option<Instant>,
    stopped: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(self) -> Self {
        Self {
            started: Some(Instant::now()),
            stopped: None,
        }
    }

    pub fn stop(self) -> Self {
        Self {
            stopped: Some(Instant::now()),
            ..self
        }
    }

    /// Elapsed time between start and stop.
    ///
    /// Returns `None`, with a logged warning, if the timer was never started or
    /// never stopped.
    pub fn duration(&self) -> Option<Duration> {
        let Some(started) = self.started else {
            warn!("Timer was never started, no duration available");
            return None;
        };
        let Some(stopped) = self.stopped else {
            warn!("Timer was never stopped, no duration available");
            return None;
        };
        Some(stopped.saturating_duration_since(started))
    }

    /// Duration truncated to whole minutes.
    pub fn duration_minutes(&self) -> Option<u64> {
        self.duration().map(|d| d.as_secs() / 60)
    }
}

/// Directories an ingestion run works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionContext {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl IngestionContext {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub result: IngestionResult,
    pub result_path: PathBuf,
    pub duration_minutes: Option<u64>,
    pub train_samples: usize,
    pub test_samples: usize,
    /// See [`LoadedData::test_is_train_fallback`].
    pub test_is_train_fallback: bool,
}

/// Loads training and test samples from `input_dir`.
///
/// Files listed in `input_data.csv` are training samples labeled from the
/// manifest; every other `.npz` file is a test sample. When there are no test
/// files the training set is reused without labels and the returned data is
/// flagged, since scoring it would only measure training accuracy.
///
/// # Errors
/// - `MissingManifest` if `input_data.csv` does not exist
/// - CSV and I/O errors while reading the manifest or listing the directory
///
/// Individual samples that fail to load are logged and skipped.
pub fn load_train_and_test_data(input_dir: &Path) -> Result<LoadedData> {
    info!("Loading data from {:?}", input_dir);

    let manifest = dataset::read_manifest(input_dir)?;
    info!("Found {} entries in {}", manifest.len(), dataset::MANIFEST_FILE);

    let all_files = dataset::list_sample_files(input_dir)?;
    info!("Found {} .{} files in input directory", all_files.len(), dataset::SAMPLE_EXTENSION);

    let train_files: HashSet<&str> = manifest.iter().map(|entry| entry.filename.as_str()).collect();
    let test_files: Vec<&str> = all_files
        .iter()
        .map(String::as_str)
        .filter(|name| !train_files.contains(name))
        .collect();
    info!("Training files: {}", train_files.len());
    info!("Test files: {}", test_files.len());

    let train_samples = dataset::load_samples(
        input_dir,
        manifest.iter().map(|entry| (entry.filename.as_str(), Some(entry.variety))),
    );
    let train = Dataset::from_samples(train_samples, true);
    info!("Loaded {} training samples", train.len());
    if let Some(shape) = train.image_shape() {
        info!("Training image shape: {:?}", shape);
    }
    info!("Labels distribution: {:?}", train.label_distribution());

    let (test, test_is_train_fallback) = if test_files.is_empty() {
        warn!("No separate test files found, reusing training data as test data");
        (train.without_labels(), true)
    } else {
        let test_samples = dataset::load_samples(input_dir, test_files.iter().map(|name| (*name, None)));
        (Dataset::from_samples(test_samples, false), false)
    };
    info!("Loaded {} test samples", test.len());

    Ok(LoadedData {
        train,
        test,
        test_is_train_fallback,
    })
}

/// Constructs the submitted model.
pub fn init_submission<M, F>(construct: F) -> std::result::Result<M, ModelError>
where
    M: Model,
    F: FnOnce() -> std::result::Result<M, ModelError>,
{
    info!("Initializing submitted model");
    construct()
}

pub fn fit_submission<M: Model + ?Sized>(model: &mut M, train: &Dataset) -> std::result::Result<(), ModelError> {
    info!("Fitting submitted model");
    model.fit(train)
}

pub fn predict_submission<M: Model + ?Sized>(model: &M, test: &Dataset) -> std::result::Result<Vec<i64>, ModelError> {
    info!("Calling predict method of submitted model");
    let predictions = model.predict(test)?;
    info!("Generated {} predictions", predictions.len());
    Ok(predictions)
}

/// Pairs test grain ids with predictions by position.
///
/// Relies on the model returning predictions in input order. Extra ids or
/// predictions beyond the shorter of the two are dropped with a warning.
pub fn compute_result(grain_ids: &[String], predictions: &[i64]) -> IngestionResult {
    info!("Computing ingestion result");
    if grain_ids.len() != predictions.len() {
        warn!(
            "Model returned {} predictions for {} test samples",
            predictions.len(),
            grain_ids.len()
        );
    }
    let map: PredictionMap = grain_ids
        .iter()
        .cloned()
        .zip(predictions.iter().copied())
        .collect();
    let result = IngestionResult::new(map);
    info!("Result contains {} predictions", result.num_predictions);
    result
}

/// Writes `result.json` into `output_dir`, creating the directory if needed.
pub fn save_result(result: &IngestionResult, output_dir: &Path) -> Result<PathBuf> {
    let path = artifacts::write_json(output_dir, RESULT_FILE, result)?;
    info!("Results saved to {:?}", path);
    Ok(path)
}

/// Writes `ingestion_duration.json` if the timer has a duration.
///
/// Returns `Ok(None)` without writing anything when it does not.
pub fn save_duration(timer: &Timer, output_dir: &Path) -> Result<Option<u64>> {
    let Some(minutes) = timer.duration_minutes() else {
        return Ok(None);
    };
    let record = IngestionDuration {
        ingestion_duration: Some(minutes),
    };
    artifacts::write_json(output_dir, DURATION_FILE, &record)?;
    Ok(Some(minutes))
}

/// Runs the whole ingestion stage.
///
/// Model errors abort the run; nothing is retried.
pub fn run<M, F>(ctx: &IngestionContext, construct: F) -> Result<IngestionReport>
where
    M: Model,
    F: FnOnce() -> std::result::Result<M, ModelError>,
{
    let timer = Timer::new().start();

    let data = load_train_and_test_data(&ctx.input_dir)?;
    if data.test_is_train_fallback {
        warn!("Test set is the training set, the resulting score is NOT a valid evaluation");
    }

    let mut model = init_submission(construct)?;
    fit_submission(&mut model, &data.train)?;
    let predictions = predict_submission(&model, &data.test)?;

    let result = compute_result(&data.test.grain_ids, &predictions);
    let result_path = save_result(&result, &ctx.output_dir)?;

    let timer = timer.stop();
    let duration_minutes = save_duration(&timer, &ctx.output_dir)?;
    if let Some(duration) = timer.duration() {
        info!("Ingestion finished in {:.2?}", duration);
    }

    Ok(IngestionReport {
        result,
        result_path,
        duration_minutes,
        train_samples: data.train.len(),
        test_samples: data.test.len(),
        test_is_train_fallback: data.test_is_train_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_requires_start_and_stop() {
        assert_eq!(Timer::new().duration(), None);
        assert_eq!(Timer::new().start().duration(), None);
        assert_eq!(Timer::new().stop().duration(), None);
        assert!(Timer::new().start().stop().duration().is_some());
        assert_eq!(Timer::new().start().stop().duration_minutes(), Some(0));
    }

    #[test]
    fn test_compute_result_zips_positionally() {
        let ids = vec!["7".to_string(), "9".to_string()];
        let result = compute_result(&ids, &[3, 1]);
        assert_eq!(result.num_predictions, 2);
        assert_eq!(result.predictions["7"], 3);
        assert_eq!(result.predictions["9"], 1);
    }

    #[test]
    fn test_compute_result_truncates_on_length_mismatch() {
        let ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        let result = compute_result(&ids, &[5]);
        assert_eq!(result.num_predictions, 1);
        assert_eq!(result.predictions.get("1"), Some(&5));
    }

    #[test]
    fn test_save_duration_skips_without_timing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(save_duration(&Timer::new(), dir.path()).unwrap(), None);
        assert!(!dir.path().join(DURATION_FILE).exists());

        let timer = Timer::new().start().stop();
        assert_eq!(save_duration(&timer, dir.path()).unwrap(), Some(0));
        assert!(dir.path().join(DURATION_FILE).exists());
    }
}
