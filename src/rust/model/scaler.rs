use ndarray::{Array1, Array2, Axis};

use super::error::ModelError;

/// Column-wise standardization to zero mean and unit variance.
///
/// Columns with zero variance keep a scale of 1 so they map to 0 instead of NaN.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    mean: Option<Array1<f32>>,
    scale: Option<Array1<f32>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    pub fn fit(&mut self, features: &Array2<f32>) -> Result<(), ModelError> {
        if features.nrows() == 0 {
            return Err(ModelError::FitError("Cannot fit scaler on an empty matrix".into()));
        }
        let mean = features
            .mean_axis(Axis(0))
            .ok_or_else(|| ModelError::FitError("Failed to compute column means".into()))?;
        let scale = features.std_axis(Axis(0), 0.0).mapv(|s| if s > 1e-12 { s } else { 1.0 });
        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    pub fn transform(&self, features: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => (mean, scale),
            _ => return Err(ModelError::PredictionError("Scaler has not been fitted".into())),
        };
        if features.ncols() != mean.len() {
            return Err(ModelError::ValidationError(format!(
                "Expected {} features, got {}",
                mean.len(),
                features.ncols()
            )));
        }
        Ok((features - mean) / scale)
    }

    pub fn fit_transform(&mut self, features: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        self.fit(features)?;
        self.transform(features)
    }
}
