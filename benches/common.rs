use ridgeprint::Matrix;
use ridgeprint::tools::synthetic::{arch_pattern, parallel_ridges};
use ridgeprint::tools::{bench_limit_from_env, dataset_iter, dataset_root_from_env, load_luma};
use std::path::PathBuf;

/// Synthetic arch at a typical sensor resolution
#[allow(dead_code)]
pub fn synthetic_arch() -> Matrix<u8> {
    arch_pattern(320, 320)
}

/// Normalized-looking float ridges for single stage benches
#[allow(dead_code)]
pub fn synthetic_ridges(size: usize) -> Matrix<f32> {
    parallel_ridges(size, size, 0.6, 9.0).map(|v| v - 127.0)
}

/// Real images from `FP_DATASET_ROOT`, empty when the directory is missing
#[allow(dead_code)]
pub fn collect_dataset_images() -> (PathBuf, Vec<Matrix<u8>>) {
    let root = dataset_root_from_env();
    let limit = bench_limit_from_env();
    let images = dataset_iter(&root, limit)
        .filter_map(|path| load_luma(path).ok())
        .collect();
    (root, images)
}
