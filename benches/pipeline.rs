use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ridgeprint::{PipelineParams, analyze_batch, analyze_image, classify_image};

mod common;

fn bench_analyze_synthetic(c: &mut Criterion) {
    let image = common::synthetic_arch();
    let params = PipelineParams::default();
    c.bench_function("analyze_320x320", |b| {
        b.iter(|| analyze_image(black_box(&image), black_box(&params)))
    });
}

fn bench_classify_synthetic(c: &mut Criterion) {
    let image = common::synthetic_arch();
    let params = PipelineParams::default();
    c.bench_function("classify_320x320", |b| {
        b.iter(|| classify_image(black_box(&image), black_box(&params)))
    });
}

fn bench_dataset(c: &mut Criterion) {
    let (root, images) = common::collect_dataset_images();
    if images.is_empty() {
        eprintln!("No images under {}, skipping dataset bench", root.display());
        return;
    }
    let params = PipelineParams::default();
    let mut group = c.benchmark_group("dataset");
    group.sample_size(10);
    group.bench_function(format!("analyze_batch_{}", images.len()), |b| {
        b.iter(|| analyze_batch(black_box(&images), black_box(&params)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_analyze_synthetic,
    bench_classify_synthetic,
    bench_dataset
);
criterion_main!(benches);
