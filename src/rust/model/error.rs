use std::fmt;

/// Represents the different types of errors a submitted model can raise.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Error occurred due to invalid configuration or input shapes
    ValidationError(String),
    /// Error occurred while extracting features from an image
    FeatureError(String),
    /// Error occurred while fitting the model
    FitError(String),
    /// Error occurred while making predictions
    PredictionError(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::FeatureError(msg) => write!(f, "Feature error: {}", msg),
            Self::FitError(msg) => write!(f, "Fit error: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}
