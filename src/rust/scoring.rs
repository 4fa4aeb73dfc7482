//! Scoring stage: compare ingestion predictions against ground truth.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

use crate::artifacts::{
    self, coerce_variety, IngestionDuration, IngestionResult, PredictionMap, ScoreRecord, DURATION_FILE,
    RESULT_FILE, SCORES_FILE,
};
use crate::error::{HarnessError, Result};

/// Ground-truth file read from the reference directory.
pub const REFERENCE_FILE: &str = "reference_data.csv";

/// Mapping from grain id to true variety.
pub type ReferenceMap = HashMap<String, i64>;

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    #[serde(rename = "grainID")]
    grain_id: String,
    #[serde(rename = "varietyNumber")]
    variety_number: String,
}

/// Everything the scoring stage reads from the predictions directory.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPredictions {
    pub predictions: PredictionMap,
    /// Ingestion duration in minutes, when `ingestion_duration.json` was present.
    pub ingestion_duration: Option<u64>,
}

/// Outcome of [`compute_scores`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub record: ScoreRecord,
    /// Predictions whose grain id has no ground truth. They do not count
    /// towards `correct` or `total`.
    pub missing_ground_truth: u64,
}

/// Directories a scoring run works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringContext {
    pub reference_dir: PathBuf,
    pub predictions_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ScoringContext {
    pub fn new(
        reference_dir: impl Into<PathBuf>,
        predictions_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reference_dir: reference_dir.into(),
            predictions_dir: predictions_dir.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// Reads `reference_data.csv` into a grain id → variety map.
///
/// # Errors
/// - `MissingReference` if the file does not exist
/// - `Malformed` if a variety is not an integer
pub fn load_reference_data(reference_dir: &Path) -> Result<ReferenceMap> {
    info!("Reading reference data");
    let path = reference_dir.join(REFERENCE_FILE);
    if !path.is_file() {
        return Err(HarnessError::MissingReference(reference_dir.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(&path)?;
    let mut reference = ReferenceMap::new();
    for row in reader.deserialize::<ReferenceRow>() {
        let row = row?;
        let variety = coerce_variety(&row.variety_number).ok_or_else(|| HarnessError::Malformed {
            file: REFERENCE_FILE.to_string(),
            reason: format!("varietyNumber '{}' for grain '{}' is not an integer", row.variety_number, row.grain_id),
        })?;
        reference.insert(row.grain_id, variety);
    }
    info!("Loaded {} ground truth labels", reference.len());
    Ok(reference)
}

/// Reads `result.json` and, if present, `ingestion_duration.json`.
///
/// # Errors
/// `MissingPredictions` if `result.json` does not exist. A missing or
/// unreadable duration file is not an error.
pub fn load_ingestion_result(predictions_dir: &Path) -> Result<LoadedPredictions> {
    info!("Reading ingestion result");
    let result_path = predictions_dir.join(RESULT_FILE);
    if !result_path.is_file() {
        return Err(HarnessError::MissingPredictions(predictions_dir.to_path_buf()));
    }
    let result: IngestionResult = artifacts::read_json(&result_path)?;
    info!("Loaded {} predictions", result.predictions.len());

    let duration_path = predictions_dir.join(DURATION_FILE);
    let ingestion_duration = if duration_path.is_file() {
        match artifacts::read_json::<IngestionDuration>(&duration_path) {
            Ok(duration) => {
                if let Some(minutes) = duration.ingestion_duration {
                    info!("Ingestion duration: {} minutes", minutes);
                }
                duration.ingestion_duration
            }
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", DURATION_FILE, e);
                None
            }
        }
    } else {
        None
    };

    Ok(LoadedPredictions {
        predictions: result.predictions,
        ingestion_duration,
    })
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Computes accuracy over the grain ids both maps have in common.
///
/// Either map being absent or empty yields a zero record rather than an error.
pub fn compute_scores(predictions: Option<&PredictionMap>, reference: Option<&ReferenceMap>) -> Scores {
    info!("Computing scores");
    let zero = Scores {
        record: ScoreRecord::zero(),
        missing_ground_truth: 0,
    };

    let Some(predictions) = predictions.filter(|p| !p.is_empty()) else {
        warn!("No predictions found");
        return zero;
    };
    let Some(reference) = reference.filter(|r| !r.is_empty()) else {
        warn!("No reference data found");
        return zero;
    };

    let mut correct = 0u64;
    let mut total = 0u64;
    let mut missing_ground_truth = 0u64;
    for (grain_id, predicted) in predictions {
        match reference.get(grain_id) {
            Some(truth) => {
                if predicted == truth {
                    correct += 1;
                }
                total += 1;
            }
            None => missing_ground_truth += 1,
        }
    }

    let accuracy = if total > 0 { correct as f64 / total as f64 } else { 0.0 };
    info!("Correct predictions: {}/{}", correct, total);
    info!("Accuracy: {:.4} ({:.2}%)", accuracy, accuracy * 100.0);
    if missing_ground_truth > 0 {
        warn!("{} predictions had no ground truth", missing_ground_truth);
    }

    Scores {
        record: ScoreRecord {
            score: round_to(accuracy, 6),
            correct,
            total,
            accuracy_percent: round_to(accuracy * 100.0, 2),
        },
        missing_ground_truth,
    }
}

/// Writes `scores.json` into `output_dir`, creating the directory if needed.
pub fn write_scores(record: &ScoreRecord, output_dir: &Path) -> Result<PathBuf> {
    info!("Writing scores");
    let path = artifacts::write_json(output_dir, SCORES_FILE, record)?;
    info!("Scores saved to {:?}", path);
    Ok(path)
}

/// Runs the whole scoring stage and returns what was written.
pub fn run(ctx: &ScoringContext) -> Result<Scores> {
    let reference = load_reference_data(&ctx.reference_dir)?;
    let loaded = load_ingestion_result(&ctx.predictions_dir)?;
    let scores = compute_scores(Some(&loaded.predictions), Some(&reference));
    write_scores(&scores.record, &ctx.output_dir)?;
    Ok(scores)
}
