use ndarray::Array3;

mod loader;
mod npz;

pub use loader::{list_sample_files, load_samples, read_manifest, ManifestEntry, MANIFEST_FILE, SAMPLE_EXTENSION};
pub use npz::read_image;

/// Literal prefix carried by every sample filename before the numeric id.
pub const GRAIN_ID_PREFIX: &str = "grain";

/// One loaded specimen.
#[derive(Debug, Clone)]
pub struct Sample {
    pub grain_id: String,
    /// Image laid out as `(height, width, channels)`.
    pub image: Array3<f32>,
    pub variety: Option<i64>,
}

/// Ordered collection of samples as handed to a model.
///
/// `labels` is `Some` for training data and `None` for test data. When present
/// it has exactly one entry per image.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub images: Vec<Array3<f32>>,
    pub labels: Option<Vec<i64>>,
    pub grain_ids: Vec<String>,
}

impl Dataset {
    pub fn from_samples(samples: Vec<Sample>, labeled: bool) -> Self {
        let mut images = Vec::with_capacity(samples.len());
        let mut labels = Vec::with_capacity(samples.len());
        let mut grain_ids = Vec::with_capacity(samples.len());
        for sample in samples {
            images.push(sample.image);
            grain_ids.push(sample.grain_id);
            if let Some(variety) = sample.variety {
                labels.push(variety);
            }
        }
        Self {
            images,
            labels: labeled.then_some(labels),
            grain_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Copy of this dataset with labels removed.
    pub fn without_labels(&self) -> Self {
        Self {
            images: self.images.clone(),
            labels: None,
            grain_ids: self.grain_ids.clone(),
        }
    }

    /// Per-label sample counts, sorted by label.
    pub fn label_distribution(&self) -> Vec<(i64, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for label in self.labels.iter().flatten() {
            *counts.entry(*label).or_insert(0usize) += 1;
        }
        counts.into_iter().collect()
    }

    /// Shape of the first image, for logging.
    pub fn image_shape(&self) -> Option<&[usize]> {
        self.images.first().map(|image| image.shape())
    }
}

/// Train and test data produced by the ingestion loader.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub train: Dataset,
    pub test: Dataset,
    /// Set when no dedicated test files existed and the training set was reused.
    /// Scores computed from such a run are not a valid evaluation.
    pub test_is_train_fallback: bool,
}

/// Extracts the grain id from a sample filename.
///
/// The id is the text before the first `_`, with the `grain` prefix removed:
/// `grain12205_x45y19-var4_11000_us_2x_2020-12-02T111648_corr.npz` gives `12205`.
pub fn parse_grain_id(filename: &str) -> String {
    let token = filename.split('_').next().unwrap_or(filename);
    token.strip_prefix(GRAIN_ID_PREFIX).unwrap_or(token).to_string()
}
