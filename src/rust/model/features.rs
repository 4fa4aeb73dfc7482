use std::fmt;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use super::error::ModelError;

/// Turns one `(height, width, channels)` image into a flat feature vector.
///
/// Implementations must be deterministic and must produce the same number of
/// features for images of the same shape; the pipeline checks the latter.
pub trait FeatureExtractor: fmt::Debug + Send + Sync {
    /// Short name used in logs and [`super::ModelInfo`].
    fn name(&self) -> &'static str;

    fn extract(&self, image: ArrayView3<f32>) -> Result<Vec<f32>, ModelError>;
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<FeaturePipeline>();
    }
};

fn channels<'a, 'b>(image: &'b ArrayView3<'a, f32>) -> impl Iterator<Item = ArrayView2<'b, f32>> + 'b {
    image.axis_iter(Axis(2))
}

/// Per-channel intensity histogram over `[0, 1]`.
///
/// Channels whose maximum exceeds 1 are assumed to be 8-bit and are scaled by
/// 1/255 first. Each channel histogram is normalized to sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorHistogram {
    pub bins: usize,
}

impl FeatureExtractor for ColorHistogram {
    fn name(&self) -> &'static str {
        "color_histogram"
    }

    fn extract(&self, image: ArrayView3<f32>) -> Result<Vec<f32>, ModelError> {
        if self.bins == 0 {
            return Err(ModelError::ValidationError("Histogram needs at least one bin".into()));
        }
        let mut features = Vec::with_capacity(self.bins * image.len_of(Axis(2)));
        for channel in channels(&image) {
            let max = channel.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let scale = if max > 1.0 { 1.0 / 255.0 } else { 1.0 };

            let mut hist = vec![0f32; self.bins];
            for &value in channel.iter() {
                let x = value * scale;
                // NaN fails both comparisons and is dropped here too.
                if !(0.0..=1.0).contains(&x) {
                    continue;
                }
                let idx = ((x * self.bins as f32) as usize).min(self.bins - 1);
                hist[idx] += 1.0;
            }

            let total: f32 = hist.iter().sum::<f32>() + 1e-8;
            features.extend(hist.into_iter().map(|count| count / total));
        }
        Ok(features)
    }
}

/// Seven summary statistics per channel: mean, standard deviation, min, max,
/// median, 25th and 75th percentile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStatistics;

impl ChannelStatistics {
    /// Percentile of sorted data with linear interpolation between ranks.
    pub(crate) fn percentile(sorted: &[f32], q: f64) -> f32 {
        if sorted.is_empty() {
            return 0.0;
        }
        let pos = q * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let frac = (pos - lo as f64) as f32;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

impl FeatureExtractor for ChannelStatistics {
    fn name(&self) -> &'static str {
        "channel_statistics"
    }

    fn extract(&self, image: ArrayView3<f32>) -> Result<Vec<f32>, ModelError> {
        let mut features = Vec::with_capacity(7 * image.len_of(Axis(2)));
        for channel in channels(&image) {
            if channel.is_empty() {
                return Err(ModelError::FeatureError("Cannot compute statistics of an empty image".into()));
            }
            let mut values: Vec<f32> = channel.iter().cloned().collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let n = values.len() as f64;
            let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
            let variance = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;

            features.extend([
                mean as f32,
                variance.sqrt() as f32,
                values[0],
                values[values.len() - 1],
                Self::percentile(&values, 0.5),
                Self::percentile(&values, 0.25),
                Self::percentile(&values, 0.75),
            ]);
        }
        Ok(features)
    }
}

/// Block-mean downsampling to a fixed `height x width` grid, flattened
/// row-major with channels innermost.
///
/// Images smaller than the grid are cropped to the top-left corner instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Downsample {
    pub height: usize,
    pub width: usize,
}

impl FeatureExtractor for Downsample {
    fn name(&self) -> &'static str {
        "downsample"
    }

    fn extract(&self, image: ArrayView3<f32>) -> Result<Vec<f32>, ModelError> {
        let (h, w, c) = image.dim();
        let block_h = h / self.height.max(1);
        let block_w = w / self.width.max(1);

        if block_h == 0 || block_w == 0 {
            let crop = image.slice(ndarray::s![..self.height.min(h), ..self.width.min(w), ..]);
            return Ok(crop.iter().cloned().collect());
        }

        let mut out = Array3::<f32>::zeros((self.height, self.width, c));
        let area = (block_h * block_w) as f32;
        for i in 0..self.height {
            for j in 0..self.width {
                let block = image.slice(ndarray::s![
                    i * block_h..(i + 1) * block_h,
                    j * block_w..(j + 1) * block_w,
                    ..
                ]);
                for ch in 0..c {
                    out[[i, j, ch]] = block.index_axis(Axis(2), ch).sum() / area;
                }
            }
        }
        Ok(out.iter().cloned().collect())
    }
}

/// Ordered concatenation of feature extractors.
#[derive(Debug, Default)]
pub struct FeaturePipeline {
    extractors: Vec<Box<dyn FeatureExtractor>>,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, extractor: impl FeatureExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn push(&mut self, extractor: Box<dyn FeatureExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn extract(&self, image: ArrayView3<f32>) -> Result<Vec<f32>, ModelError> {
        let mut features = Vec::new();
        for extractor in &self.extractors {
            features.extend(extractor.extract(image)?);
        }
        Ok(features)
    }

    /// Extracts features for every image into a `(samples, features)` matrix.
    ///
    /// # Errors
    /// - `ValidationError` if the pipeline is empty or images yield different widths
    /// - Any error from the individual extractors
    pub fn extract_batch(&self, images: &[Array3<f32>]) -> Result<Array2<f32>, ModelError> {
        if self.extractors.is_empty() {
            return Err(ModelError::ValidationError("Feature pipeline has no extractors".into()));
        }
        let mut width = None;
        let mut flat = Vec::new();
        for (i, image) in images.iter().enumerate() {
            let features = self.extract(image.view())?;
            match width {
                None => width = Some(features.len()),
                Some(w) if w != features.len() => {
                    return Err(ModelError::ValidationError(format!(
                        "Sample {} produced {} features, expected {} (images must share a shape)",
                        i,
                        features.len(),
                        w
                    )));
                }
                Some(_) => {}
            }
            flat.extend(features);
        }
        let width = width.unwrap_or(0);
        Array2::from_shape_vec((images.len(), width), flat)
            .map_err(|e| ModelError::FeatureError(format!("Failed to assemble feature matrix: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn ramp(h: usize, w: usize, c: usize) -> Array3<f32> {
        Array3::from_shape_fn((h, w, c), |(i, j, k)| (i * w * c + j * c + k) as f32)
    }

    #[test]
    fn test_channels_follow_last_axis() {
        let image = Array3::from_shape_fn((2, 3, 4), |(_, _, c)| c as f32);
        let view = image.view();
        let sums: Vec<f32> = channels(&view).map(|channel| channel.sum()).collect();
        assert_eq!(sums, vec![0.0, 6.0, 12.0, 18.0]);
        assert!(channels(&view).all(|channel| channel.dim() == (2, 3)));
    }

    #[test]
    fn test_histogram_sums_to_one_per_channel() {
        let image = ramp(8, 8, 3);
        let features = ColorHistogram { bins: 4 }.extract(image.view()).unwrap();
        assert_eq!(features.len(), 12);
        for chunk in features.chunks(4) {
            assert!((chunk.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_histogram_unit_range_values() {
        let image = Array3::from_shape_vec((1, 4, 1), vec![0.0, 0.3, 0.6, 1.0]).unwrap();
        let features = ColorHistogram { bins: 2 }.extract(image.view()).unwrap();
        assert!((features[0] - 0.5).abs() < 1e-6);
        assert!((features[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_statistics() {
        let image = Array3::from_shape_vec((1, 5, 1), vec![5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        let features = ChannelStatistics.extract(image.view()).unwrap();
        assert_eq!(features.len(), 7);
        assert!((features[0] - 3.0).abs() < 1e-6); // mean
        assert!((features[1] - 2f32.sqrt()).abs() < 1e-6); // std
        assert_eq!(features[2], 1.0);
        assert_eq!(features[3], 5.0);
        assert_eq!(features[4], 3.0);
        assert_eq!(features[5], 2.0);
        assert_eq!(features[6], 4.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        assert_eq!(ChannelStatistics::percentile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        assert_eq!(ChannelStatistics::percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_downsample_block_mean() {
        let image = Array3::from_shape_vec((2, 2, 1), vec![1.0, 3.0, 5.0, 7.0]).unwrap();
        let features = Downsample { height: 1, width: 1 }.extract(image.view()).unwrap();
        assert_eq!(features, vec![4.0]);

        let image = ramp(32, 32, 3);
        let features = Downsample { height: 16, width: 16 }.extract(image.view()).unwrap();
        assert_eq!(features.len(), 16 * 16 * 3);
    }

    #[test]
    fn test_downsample_small_image_crops() {
        let image = ramp(3, 3, 1);
        let features = Downsample { height: 16, width: 16 }.extract(image.view()).unwrap();
        assert_eq!(features.len(), 9);
    }

    #[test]
    fn test_pipeline_rejects_mixed_shapes() {
        let pipeline = FeaturePipeline::new().with(Downsample { height: 4, width: 4 });
        let images = vec![ramp(8, 8, 1), ramp(2, 2, 1)];
        let result = pipeline.extract_batch(&images);
        assert!(matches!(result, Err(ModelError::ValidationError(_))));
    }

    #[test]
    fn test_pipeline_concatenates() {
        let pipeline = FeaturePipeline::new()
            .with(ColorHistogram { bins: 8 })
            .with(ChannelStatistics);
        let matrix = pipeline.extract_batch(&[ramp(4, 4, 3), ramp(4, 4, 3)]).unwrap();
        assert_eq!(matrix.dim(), (2, 8 * 3 + 7 * 3));
        assert_eq!(pipeline.names(), vec!["color_histogram", "channel_statistics"]);
    }
}
