use log::info;

use super::classifier::{Classifier, KNearest, NearestCentroid};
use super::error::ModelError;
use super::features::{ChannelStatistics, ColorHistogram, Downsample, FeatureExtractor, FeaturePipeline};
use super::grain_model::GrainModel;
use super::{ClassifierKind, ModelConfig};

/// A builder for constructing a [`GrainModel`] with a fluent interface.
///
/// By default the model uses the three standard extractors (color histogram,
/// channel statistics, downsampled pixels) with the settings from
/// [`ModelConfig::default`]. Custom extractors replace the standard set.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    config: ModelConfig,
    custom_extractors: Vec<Box<dyn FeatureExtractor>>,
}

impl ModelBuilder {
    /// Creates a builder with the default configuration
    ///
    /// # Example
    /// ```
    /// use grainbench::ModelBuilder;
    ///
    /// let builder = ModelBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration
    pub fn with_config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of histogram bins per channel
    ///
    /// # Errors
    /// `ValidationError` if `bins` is zero
    pub fn with_histogram_bins(mut self, bins: usize) -> Result<Self, ModelError> {
        if bins == 0 {
            return Err(ModelError::ValidationError("Histogram bins must be greater than zero".into()));
        }
        self.config.histogram_bins = bins;
        Ok(self)
    }

    /// Sets the downsampling grid
    ///
    /// # Errors
    /// `ValidationError` if either dimension is zero
    pub fn with_downsample(mut self, height: usize, width: usize) -> Result<Self, ModelError> {
        if height == 0 || width == 0 {
            return Err(ModelError::ValidationError("Downsample grid must be non-empty".into()));
        }
        self.config.downsample = (height, width);
        Ok(self)
    }

    /// Selects the classification strategy
    ///
    /// # Example
    /// ```
    /// use grainbench::{ModelBuilder, model::ClassifierKind};
    ///
    /// let model = ModelBuilder::new()
    ///     .with_classifier(ClassifierKind::KNearest { k: 5 })
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(model.info().classifier, "k_nearest");
    /// ```
    pub fn with_classifier(mut self, kind: ClassifierKind) -> Self {
        self.config.classifier = kind;
        self
    }

    pub fn with_standardization(mut self, enabled: bool) -> Self {
        self.config.standardize = enabled;
        self
    }

    /// Adds a custom feature extractor. Once any custom extractor is added the
    /// standard set is no longer used.
    pub fn add_extractor(mut self, extractor: impl FeatureExtractor + 'static) -> Self {
        self.custom_extractors.push(Box::new(extractor));
        self
    }

    fn validate_config(config: &ModelConfig) -> Result<(), ModelError> {
        if config.histogram_bins == 0 {
            return Err(ModelError::ValidationError("Histogram bins must be greater than zero".into()));
        }
        if config.downsample.0 == 0 || config.downsample.1 == 0 {
            return Err(ModelError::ValidationError("Downsample grid must be non-empty".into()));
        }
        if let ClassifierKind::KNearest { k: 0 } = config.classifier {
            return Err(ModelError::ValidationError("k must be at least 1".into()));
        }
        Ok(())
    }

    /// Builds the model
    ///
    /// # Errors
    /// `ValidationError` if the configuration is invalid
    pub fn build(self) -> Result<GrainModel, ModelError> {
        Self::validate_config(&self.config)?;

        let mut pipeline = FeaturePipeline::new();
        if self.custom_extractors.is_empty() {
            let (height, width) = self.config.downsample;
            pipeline = pipeline
                .with(ColorHistogram { bins: self.config.histogram_bins })
                .with(ChannelStatistics)
                .with(Downsample { height, width });
        } else {
            for extractor in self.custom_extractors {
                pipeline.push(extractor);
            }
        }

        let classifier: Box<dyn Classifier> = match self.config.classifier {
            ClassifierKind::NearestCentroid => Box::new(NearestCentroid::new()),
            ClassifierKind::KNearest { k } => Box::new(KNearest::new(k)?),
        };

        info!(
            "Initializing model: features={:?}, classifier={}, standardize={}",
            pipeline.names(),
            classifier.name(),
            self.config.standardize
        );
        Ok(GrainModel::new(pipeline, classifier, self.config.standardize))
    }
}
