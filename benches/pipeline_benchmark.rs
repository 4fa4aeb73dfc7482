use criterion::{black_box, criterion_group, criterion_main, Criterion};
use grainbench::model::{ChannelStatistics, ColorHistogram, Downsample, FeatureExtractor, FeaturePipeline};
use grainbench::scoring::{compute_scores, ReferenceMap};
use grainbench::{Dataset, GrainModel, Model, PredictionMap};
use ndarray::Array3;

fn synthetic_image(seed: usize) -> Array3<f32> {
    Array3::from_shape_fn((128, 128, 3), |(i, j, c)| ((i * 7 + j * 13 + c * 31 + seed * 17) % 256) as f32)
}

fn bench_feature_extraction(c: &mut Criterion) {
    let image = synthetic_image(0);
    let mut group = c.benchmark_group("FeatureExtraction");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let histogram = ColorHistogram { bins: 32 };
    group.bench_function("color_histogram", |b| b.iter(|| histogram.extract(black_box(image.view())).unwrap()));

    group.bench_function("channel_statistics", |b| {
        b.iter(|| ChannelStatistics.extract(black_box(image.view())).unwrap())
    });

    let downsample = Downsample { height: 16, width: 16 };
    group.bench_function("downsample", |b| b.iter(|| downsample.extract(black_box(image.view())).unwrap()));

    let pipeline = FeaturePipeline::new()
        .with(ColorHistogram { bins: 32 })
        .with(ChannelStatistics)
        .with(Downsample { height: 16, width: 16 });
    group.bench_function("full_pipeline", |b| b.iter(|| pipeline.extract(black_box(image.view())).unwrap()));

    group.finish();
}

fn bench_model(c: &mut Criterion) {
    let train = Dataset {
        images: (0..40).map(synthetic_image).collect(),
        labels: Some((0..40).map(|i| (i % 4) as i64).collect()),
        grain_ids: (0..40).map(|i| i.to_string()).collect(),
    };
    let test = train.without_labels();

    let mut group = c.benchmark_group("Model");
    group.sample_size(10);

    group.bench_function("fit_40", |b| {
        b.iter(|| {
            let mut model = GrainModel::builder().build().unwrap();
            model.fit(black_box(&train)).unwrap();
        })
    });

    let mut model = GrainModel::builder().build().unwrap();
    model.fit(&train).unwrap();
    group.bench_function("predict_40", |b| b.iter(|| model.predict(black_box(&test)).unwrap()));

    group.finish();
}

fn bench_scoring(c: &mut Criterion) {
    let predictions: PredictionMap = (0..10_000).map(|i| (i.to_string(), (i % 8) as i64)).collect();
    let reference: ReferenceMap = (0..10_000).map(|i| (i.to_string(), (i % 7) as i64)).collect();

    c.bench_function("compute_scores_10k", |b| {
        b.iter(|| compute_scores(black_box(Some(&predictions)), black_box(Some(&reference))))
    });
}

criterion_group!(benches, bench_feature_extraction, bench_model, bench_scoring);
criterion_main!(benches);
