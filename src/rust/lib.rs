//! Ingestion and scoring harness for the grain variety identification benchmark.
//!
//! The two stages run as separate processes and only share files:
//!
//! ```text
//!  input_data/ ──► ingestion ──► result.json, ingestion_duration.json
//!                                        │
//!  input/ref/reference_data.csv ──► scoring ──► scores.json
//! ```
//!
//! # Ingestion
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use grainbench::{ingestion, GrainModel, IngestionContext};
//!
//! let ctx = IngestionContext::new("/app/input_data", "/app/output");
//! let report = ingestion::run(&ctx, || GrainModel::builder().build())?;
//! println!("Wrote {} predictions", report.result.num_predictions);
//! # Ok(())
//! # }
//! ```
//!
//! # Scoring
//!
//! ```
//! use grainbench::scoring::{compute_scores, ReferenceMap};
//! use grainbench::artifacts::PredictionMap;
//!
//! let reference: ReferenceMap = [("7".to_string(), 3), ("9".to_string(), 1)].into_iter().collect();
//! let predictions: PredictionMap = [("7".to_string(), 3), ("9".to_string(), 2), ("5".to_string(), 3)]
//!     .into_iter()
//!     .collect();
//!
//! let scores = compute_scores(Some(&predictions), Some(&reference));
//! assert_eq!(scores.record.score, 0.5);
//! assert_eq!(scores.missing_ground_truth, 1);
//! ```
//!
//! # Custom models
//!
//! Anything implementing [`Model`] can be evaluated. The bundled [`GrainModel`]
//! combines swappable [`FeatureExtractor`]s with a swappable [`Classifier`].

pub mod artifacts;
pub mod config;
pub mod dataset;
mod error;
pub mod ingestion;
pub mod model;
pub mod scoring;
pub mod split;

pub use artifacts::{IngestionDuration, IngestionResult, PredictionMap, ScoreRecord};
pub use config::HarnessPaths;
pub use dataset::{Dataset, LoadedData, Sample};
pub use error::{HarnessError, Result};
pub use ingestion::{IngestionContext, IngestionReport, Timer};
pub use model::{
    Classifier, ClassifierKind, FeatureExtractor, GrainModel, Model, ModelBuilder, ModelConfig, ModelError, ModelInfo,
};
pub use scoring::{ReferenceMap, Scores, ScoringContext};

/// Installs `env_logger`, defaulting to `info` unless `RUST_LOG` says otherwise.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
