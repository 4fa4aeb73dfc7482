use crate::dataset::Dataset;

mod error;
pub mod builder;
pub mod classifier;
pub mod features;
mod grain_model;
pub mod scaler;
mod utils;

pub use builder::ModelBuilder;
pub use classifier::{Classifier, KNearest, NearestCentroid};
pub use error::ModelError;
pub use features::{ChannelStatistics, ColorHistogram, Downsample, FeatureExtractor, FeaturePipeline};
pub use grain_model::GrainModel;
pub use scaler::StandardScaler;

/// Capability every submission provides to the ingestion stage.
///
/// `predict` must return exactly one label per test image, in the same order as
/// `test.images`; ingestion pairs predictions with grain ids by position.
pub trait Model {
    fn fit(&mut self, train: &Dataset) -> Result<(), ModelError>;

    fn predict(&self, test: &Dataset) -> Result<Vec<i64>, ModelError>;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn fit(&mut self, train: &Dataset) -> Result<(), ModelError> {
        (**self).fit(train)
    }

    fn predict(&self, test: &Dataset) -> Result<Vec<i64>, ModelError> {
        (**self).predict(test)
    }
}

/// Which classification strategy a [`GrainModel`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    NearestCentroid,
    KNearest { k: usize },
}

impl Default for ClassifierKind {
    fn default() -> Self {
        Self::NearestCentroid
    }
}

/// Hyper-parameters of the sample model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Histogram bins per channel
    pub histogram_bins: usize,
    /// Downsampling grid as `(height, width)`
    pub downsample: (usize, usize),
    pub classifier: ClassifierKind,
    /// Standardize features before classification
    pub standardize: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 32,
            downsample: (16, 16),
            classifier: ClassifierKind::default(),
            standardize: true,
        }
    }
}

/// Information about a model's configuration and fitted state
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Names of the feature extractors, in concatenation order
    pub feature_extractors: Vec<&'static str>,
    /// Name of the classification strategy
    pub classifier: &'static str,
    /// Whether features are standardized
    pub standardize: bool,
    /// Feature vector width seen during fit, if fitted
    pub feature_width: Option<usize>,
    /// Labels learned during fit
    pub classes: Vec<i64>,
}
