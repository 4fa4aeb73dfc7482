use std::io;
use std::path::PathBuf;

use crate::model::ModelError;

/// Result alias used by the ingestion and scoring stages.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors raised by the evaluation pipeline.
///
/// The three `Missing*` variants are the fatal "required input is absent"
/// conditions of each stage. Per-sample load failures are reported as
/// `SampleLoad` but are normally logged and skipped by the loader rather than
/// propagated.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("input_data.csv not found in {0:?}")]
    MissingManifest(PathBuf),
    #[error("reference_data.csv not found in {0:?}")]
    MissingReference(PathBuf),
    #[error("result.json not found in {0:?}")]
    MissingPredictions(PathBuf),
    #[error("Failed to load sample {file}: {reason}")]
    SampleLoad {
        file: String,
        reason: String,
    },
    #[error("Malformed {file}: {reason}")]
    Malformed {
        file: String,
        reason: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Submitted model failed: {0}")]
    Model(#[from] ModelError),
}
