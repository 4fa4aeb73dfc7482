use ndarray::{Array1, ArrayView1};

pub(crate) fn normalize_vector(vec: &Array1<f32>) -> Array1<f32> {
    let norm: f32 = vec.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if norm > 1e-10 {
        vec / norm
    } else {
        Array1::zeros(vec.len())
    }
}

pub(crate) fn average_vectors(vectors: &[ArrayView1<f32>], width: usize) -> Array1<f32> {
    if vectors.is_empty() {
        return Array1::zeros(width);
    }
    let sum = vectors.iter().fold(Array1::zeros(width), |acc, v| acc + v);
    sum / vectors.len() as f32
}

pub(crate) fn squared_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
