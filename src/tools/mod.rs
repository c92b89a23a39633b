//! Image IO and dataset helpers shared by the binaries, tests and benches

use image::{DynamicImage, GenericImageView, GrayImage};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FingerprintError, Result};
use crate::models::{BitMatrix, FingerprintClass, Matrix, MinutiaeExport};
use crate::pipeline::Analysis;
use crate::utils::rescale_to_u8;

pub mod synthetic;

fn max_dim_from_env() -> Option<u32> {
    match env::var("FP_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image that is already 8-bit single channel
///
/// Colour or alpha channels are rejected with `InvalidDimensions`, wider
/// sample types (16-bit, float) with `InvalidType`.
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<Matrix<u8>> {
    let img = image::open(path)?;
    gray_from_dynamic(img)
}

/// Validate a decoded image as 8-bit grayscale
pub fn gray_from_dynamic(img: DynamicImage) -> Result<Matrix<u8>> {
    let (width, height) = img.dimensions();
    match img {
        DynamicImage::ImageLuma8(buffer) => {
            Matrix::from_raw(width as usize, height as usize, buffer.into_raw())
        }
        DynamicImage::ImageLumaA8(_) => Err(FingerprintError::InvalidDimensions(
            "image has an alpha channel, expected single-channel grayscale".into(),
        )),
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            Err(FingerprintError::InvalidDimensions(
                "image has colour channels, expected single-channel grayscale".into(),
            ))
        }
        other => Err(FingerprintError::InvalidType(format!(
            "expected 8-bit samples, got {:?}",
            other.color()
        ))),
    }
}

/// Load any image and convert it to 8-bit luma
///
/// Images larger than `FP_MAX_DIM` (when set) are downscaled first.
pub fn load_luma<P: AsRef<Path>>(path: P) -> Result<Matrix<u8>> {
    let img = image::open(path)?;
    let gray = match max_dim_from_env() {
        Some(max_dim) if img.width().max(img.height()) > max_dim => img
            .resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
            .to_luma8(),
        _ => img.to_luma8(),
    };
    let (width, height) = gray.dimensions();
    Matrix::from_raw(width as usize, height as usize, gray.into_raw())
}

fn to_gray_image(grid: &Matrix<u8>) -> Result<GrayImage> {
    let (width, height) = grid.dimensions();
    GrayImage::from_raw(width as u32, height as u32, grid.as_slice().to_vec()).ok_or_else(|| {
        FingerprintError::InvalidDimensions(format!("cannot view {width}x{height} grid as an image"))
    })
}

/// Write an 8-bit grid as PNG
pub fn save_gray_png<P: AsRef<Path>>(path: P, grid: &Matrix<u8>) -> Result<()> {
    to_gray_image(grid)?.save(path)?;
    Ok(())
}

/// Write a float grid as PNG, stretched onto [0, 255]
pub fn save_float_png<P: AsRef<Path>>(path: P, grid: &Matrix<f32>) -> Result<()> {
    save_gray_png(path, &rescale_to_u8(grid))
}

/// Write a binary grid as PNG, set bits white
pub fn save_mask_png<P: AsRef<Path>>(path: P, mask: &BitMatrix) -> Result<()> {
    let (width, height) = mask.dimensions();
    let grid = Matrix::from_fn(width, height, |x, y| if mask.get(x, y) { 255u8 } else { 0 });
    save_gray_png(path, &grid)
}

/// Write minutiae as `{"bifurcations": [...], "ridgeEndings": [...]}`
pub fn write_minutiae_json<P: AsRef<Path>>(path: P, export: &MinutiaeExport) -> Result<()> {
    fs::write(path, export.to_json()?)?;
    Ok(())
}

/// Write every stage grid of an analysis into `dir` as PNG, plus the minutiae JSON
///
/// Returns the written paths in stage order.
pub fn export_analysis<P: AsRef<Path>>(analysis: &Analysis, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let mut save = |name: &str, write: &dyn Fn(&Path) -> Result<()>| -> Result<()> {
        let path = dir.join(name);
        write(&path)?;
        written.push(path);
        Ok(())
    };

    save("01_normalized.png", &|p| save_gray_png(p, &analysis.normalized))?;
    save("02_enhanced.png", &|p| save_float_png(p, &analysis.enhanced))?;
    save("03_roi.png", &|p| save_mask_png(p, &analysis.roi))?;
    save("04_orientation.png", &|p| save_float_png(p, &analysis.orientation))?;
    save("05_frequency.png", &|p| save_float_png(p, &analysis.frequency))?;
    save("06_filtered.png", &|p| save_mask_png(p, &analysis.filtered))?;
    save("07_skeleton.png", &|p| save_mask_png(p, &analysis.skeleton))?;
    save("08_minutiae.json", &|p| {
        write_minutiae_json(p, &analysis.minutiae_export())
    })?;
    Ok(written)
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy)]
pub struct GrayStats {
    /// Minimum grayscale value.
    pub min: u8,
    /// Maximum grayscale value.
    pub max: u8,
    /// Average grayscale value.
    pub avg: u8,
}

/// Summary statistics for a binary matrix.
#[derive(Debug, Clone, Copy)]
pub struct BinaryStats {
    /// Count of set pixels.
    pub set_pixels: usize,
    /// Total pixels in the matrix.
    pub total_pixels: usize,
    /// Ratio of set pixels to total pixels.
    pub set_ratio: f64,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &Matrix<u8>) -> GrayStats {
    let values = gray.as_slice();
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0);
    let sum: u64 = values.iter().map(|&v| v as u64).sum();
    let avg = if values.is_empty() {
        0
    } else {
        (sum / values.len() as u64) as u8
    };
    GrayStats { min, max, avg }
}

/// Compute set pixel stats for a binary matrix.
pub fn binary_stats(binary: &BitMatrix) -> BinaryStats {
    let set = binary.count_ones();
    let total = binary.width() * binary.height();
    let ratio = if total == 0 {
        0.0
    } else {
        set as f64 / total as f64
    };
    BinaryStats {
        set_pixels: set,
        total_pixels: total,
        set_ratio: ratio,
    }
}

/// Default dataset root from environment variables.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("FP_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Dataset limit from `FP_BENCH_LIMIT`, `None` (everything) when unset or 0.
pub fn bench_limit_from_env() -> Option<usize> {
    match env::var("FP_BENCH_LIMIT") {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|v| if v == 0 { None } else { Some(v) }),
        Err(_) => None,
    }
}

/// Expected class from the name of the image's parent directory
///
/// `dataset/left-loop/007.png` is a left loop.
pub fn class_from_path(path: &Path) -> Option<FingerprintClass> {
    path.parent()?.file_name()?.to_str()?.parse().ok()
}

/// Image paths under `root`, sorted, optionally truncated to `limit`.
pub fn dataset_iter<P: AsRef<Path>>(root: P, limit: Option<usize>) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if matches!(
                    ext.as_str(),
                    "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff" | "gif"
                ) {
                    images.push(path);
                }
            }
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX epoch")
            .as_nanos();
        let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("ridgeprint_tools_{nanos}_{sequence}"));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    #[test]
    fn test_gray_png_survives_save_and_load() {
        let dir = temp_dir();
        let path = dir.join("ridges.png");
        let image = synthetic::parallel_ridges_u8(24, 16, 0.7, 6.0);
        save_gray_png(&path, &image).unwrap();
        assert_eq!(load_gray(&path).unwrap(), image);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_colour_and_wide_samples_are_rejected() {
        let rgb = DynamicImage::new_rgb8(4, 4);
        assert!(matches!(
            gray_from_dynamic(rgb),
            Err(FingerprintError::InvalidDimensions(_))
        ));
        let wide = DynamicImage::new_luma16(4, 4);
        assert!(matches!(
            gray_from_dynamic(wide),
            Err(FingerprintError::InvalidType(_))
        ));
        assert!(gray_from_dynamic(DynamicImage::new_luma8(4, 4)).is_ok());
    }

    #[test]
    fn test_dataset_listing_and_labels() {
        let dir = temp_dir();
        let class_dir = dir.join("right loop");
        fs::create_dir_all(&class_dir).unwrap();
        let image = Matrix::filled(4, 4, 7u8);
        save_gray_png(class_dir.join("b.png"), &image).unwrap();
        save_gray_png(class_dir.join("a.png"), &image).unwrap();
        fs::write(class_dir.join("notes.txt"), "x").unwrap();

        let paths: Vec<_> = dataset_iter(&dir, None).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("a.png"));
        assert_eq!(class_from_path(&paths[0]), Some(FingerprintClass::RightLoop));
        assert_eq!(dataset_iter(&dir, Some(1)).count(), 1);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_stats() {
        let gray = Matrix::from_raw(2, 2, vec![10u8, 20, 30, 40]).unwrap();
        let stats = grayscale_stats(&gray);
        assert_eq!((stats.min, stats.max, stats.avg), (10, 40, 25));
        let binary = BitMatrix::from_fn(4, 2, |x, _| x == 0);
        let stats = binary_stats(&binary);
        assert_eq!(stats.set_pixels, 2);
        assert_eq!(stats.set_ratio, 0.25);
    }
}
