use log::info;

use super::classifier::Classifier;
use super::error::ModelError;
use super::features::FeaturePipeline;
use super::scaler::StandardScaler;
use super::{Model, ModelInfo};
use crate::dataset::Dataset;

/// Sample submission: feature extraction, optional standardization and a
/// pluggable classifier.
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use grainbench::{Dataset, GrainModel, Model};
/// use ndarray::Array3;
///
/// let mut model = GrainModel::builder().with_downsample(2, 2)?.build()?;
/// let train = Dataset {
///     images: vec![Array3::zeros((4, 4, 3)), Array3::from_elem((4, 4, 3), 255.0)],
///     labels: Some(vec![1, 2]),
///     grain_ids: vec!["10".into(), "11".into()],
/// };
/// model.fit(&train)?;
/// let predictions = model.predict(&train.without_labels())?;
/// assert_eq!(predictions.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GrainModel {
    pipeline: FeaturePipeline,
    scaler: Option<StandardScaler>,
    classifier: Box<dyn Classifier>,
    feature_width: Option<usize>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<GrainModel>();
    }
};

impl GrainModel {
    pub(crate) fn new(pipeline: FeaturePipeline, classifier: Box<dyn Classifier>, standardize: bool) -> Self {
        Self {
            pipeline,
            scaler: standardize.then(StandardScaler::new),
            classifier,
            feature_width: None,
        }
    }

    /// Creates a new ModelBuilder for fluent construction
    pub fn builder() -> super::builder::ModelBuilder {
        super::builder::ModelBuilder::new()
    }

    /// Returns information about the model's configuration and fitted state
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            feature_extractors: self.pipeline.names(),
            classifier: self.classifier.name(),
            standardize: self.scaler.is_some(),
            feature_width: self.feature_width,
            classes: self.classifier.classes(),
        }
    }
}

impl Model for GrainModel {
    fn fit(&mut self, train: &Dataset) -> Result<(), ModelError> {
        let labels = train
            .labels
            .as_deref()
            .ok_or_else(|| ModelError::FitError("Training data has no labels".into()))?;
        if train.images.is_empty() {
            return Err(ModelError::FitError("Training data is empty".into()));
        }
        if labels.len() != train.images.len() {
            return Err(ModelError::FitError(format!(
                "Got {} images but {} labels",
                train.images.len(),
                labels.len()
            )));
        }

        info!("Extracting features from {} training samples", train.len());
        let mut features = self.pipeline.extract_batch(&train.images)?;
        info!("Extracted {} features per sample", features.ncols());

        if let Some(scaler) = self.scaler.as_mut() {
            features = scaler.fit_transform(&features)?;
        }

        info!("Training {} on {} samples", self.classifier.name(), features.nrows());
        self.classifier.fit(&features, labels)?;
        self.feature_width = Some(features.ncols());
        info!("Training complete");
        Ok(())
    }

    fn predict(&self, test: &Dataset) -> Result<Vec<i64>, ModelError> {
        let width = self
            .feature_width
            .ok_or_else(|| ModelError::PredictionError("Model has not been fitted".into()))?;
        if test.images.is_empty() {
            return Ok(Vec::new());
        }

        let mut features = self.pipeline.extract_batch(&test.images)?;
        if features.ncols() != width {
            return Err(ModelError::ValidationError(format!(
                "Test images produce {} features but the model was fitted on {}",
                features.ncols(),
                width
            )));
        }
        if let Some(scaler) = self.scaler.as_ref() {
            features = scaler.transform(&features)?;
        }

        let predictions = self.classifier.predict(&features)?;
        info!("Predicted {} samples", predictions.len());
        Ok(predictions)
    }
}
