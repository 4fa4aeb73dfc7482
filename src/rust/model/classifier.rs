use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, Axis};

use super::error::ModelError;
use super::utils::{average_vectors, normalize_vector, squared_distance};

/// Classification strategy operating on feature matrices.
pub trait Classifier: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn fit(&mut self, features: &Array2<f32>, labels: &[i64]) -> Result<(), ModelError>;

    fn predict_one(&self, features: ArrayView1<f32>) -> Result<i64, ModelError>;

    /// Distinct labels seen during fit, in ascending order.
    fn classes(&self) -> Vec<i64>;

    /// Predicts one label per row, in row order.
    fn predict(&self, features: &Array2<f32>) -> Result<Vec<i64>, ModelError> {
        features.axis_iter(Axis(0)).map(|row| self.predict_one(row)).collect()
    }
}

fn validate_training_set(features: &Array2<f32>, labels: &[i64]) -> Result<(), ModelError> {
    if features.nrows() == 0 {
        return Err(ModelError::FitError("Training set is empty".into()));
    }
    if features.nrows() != labels.len() {
        return Err(ModelError::FitError(format!(
            "Got {} feature rows but {} labels",
            features.nrows(),
            labels.len()
        )));
    }
    Ok(())
}

fn group_by_label<'a>(features: &'a Array2<f32>, labels: &[i64]) -> BTreeMap<i64, Vec<ArrayView1<'a, f32>>> {
    let mut groups: BTreeMap<i64, Vec<ArrayView1<f32>>> = BTreeMap::new();
    for (row, &label) in features.axis_iter(Axis(0)).zip(labels) {
        groups.entry(label).or_default().push(row);
    }
    groups
}

/// Prototype classifier.
///
/// Each class is represented by the L2-normalized mean of its training vectors.
/// A sample is assigned to the prototype with the highest cosine similarity.
#[derive(Debug, Clone, Default)]
pub struct NearestCentroid {
    prototypes: BTreeMap<i64, Array1<f32>>,
}

impl NearestCentroid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Similarity of `features` to every class prototype.
    pub fn scores(&self, features: ArrayView1<f32>) -> Result<HashMap<i64, f32>, ModelError> {
        let input = normalize_vector(&features.to_owned());
        let mut scores = HashMap::new();
        for (label, prototype) in &self.prototypes {
            if prototype.len() != input.len() {
                return Err(ModelError::ValidationError(format!(
                    "Expected {} features, got {}",
                    prototype.len(),
                    input.len()
                )));
            }
            scores.insert(*label, Self::cosine_similarity(&input, prototype));
        }
        Ok(scores)
    }

    fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
        a.dot(b)
    }
}

impl Classifier for NearestCentroid {
    fn name(&self) -> &'static str {
        "nearest_centroid"
    }

    fn fit(&mut self, features: &Array2<f32>, labels: &[i64]) -> Result<(), ModelError> {
        validate_training_set(features, labels)?;
        let width = features.ncols();
        self.prototypes = group_by_label(features, labels)
            .into_iter()
            .map(|(label, rows)| (label, normalize_vector(&average_vectors(&rows, width))))
            .collect();
        Ok(())
    }

    fn predict_one(&self, features: ArrayView1<f32>) -> Result<i64, ModelError> {
        if self.prototypes.is_empty() {
            return Err(ModelError::PredictionError("Classifier has not been fitted".into()));
        }
        let scores = self.scores(features)?;
        // Ties resolve to the smallest label.
        scores
            .into_iter()
            .max_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.0.cmp(&a.0))
            })
            .map(|(label, _)| label)
            .ok_or_else(|| ModelError::PredictionError("No class scores computed".into()))
    }

    fn classes(&self) -> Vec<i64> {
        self.prototypes.keys().copied().collect()
    }
}

/// Euclidean k-nearest-neighbour vote.
///
/// Vote ties go to the class with the smaller summed distance, then to the
/// smaller label.
#[derive(Debug, Clone)]
pub struct KNearest {
    k: usize,
    features: Option<Array2<f32>>,
    labels: Vec<i64>,
}

impl KNearest {
    pub fn new(k: usize) -> Result<Self, ModelError> {
        if k == 0 {
            return Err(ModelError::ValidationError("k must be at least 1".into()));
        }
        Ok(Self {
            k,
            features: None,
            labels: Vec::new(),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Classifier for KNearest {
    fn name(&self) -> &'static str {
        "k_nearest"
    }

    fn fit(&mut self, features: &Array2<f32>, labels: &[i64]) -> Result<(), ModelError> {
        validate_training_set(features, labels)?;
        self.features = Some(features.clone());
        self.labels = labels.to_vec();
        Ok(())
    }

    fn predict_one(&self, features: ArrayView1<f32>) -> Result<i64, ModelError> {
        let train = self
            .features
            .as_ref()
            .ok_or_else(|| ModelError::PredictionError("Classifier has not been fitted".into()))?;
        if train.ncols() != features.len() {
            return Err(ModelError::ValidationError(format!(
                "Expected {} features, got {}",
                train.ncols(),
                features.len()
            )));
        }

        let mut neighbours: Vec<(f32, i64)> = train
            .axis_iter(Axis(0))
            .zip(&self.labels)
            .map(|(row, &label)| (squared_distance(row, features).sqrt(), label))
            .collect();
        neighbours.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        neighbours.truncate(self.k);

        let mut votes: BTreeMap<i64, (usize, f32)> = BTreeMap::new();
        for (distance, label) in neighbours {
            let entry = votes.entry(label).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += distance;
        }

        votes
            .into_iter()
            .min_by(|a, b| {
                b.1 .0
                    .cmp(&a.1 .0)
                    .then_with(|| a.1 .1.partial_cmp(&b.1 .1).unwrap_or(std::cmp::Ordering::Equal))
                    .then_with(|| a.0.cmp(&b.0))
            })
            .map(|(label, _)| label)
            .ok_or_else(|| ModelError::PredictionError("No neighbours found".into()))
    }

    fn classes(&self) -> Vec<i64> {
        let mut classes = self.labels.clone();
        classes.sort_unstable();
        classes.dedup();
        classes
    }
}
