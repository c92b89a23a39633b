//! End-to-end regression tests for the analysis pipeline
//!
//! These run every stage on synthetic fingerprints with known structure and
//! check the properties that must survive any change to the individual
//! stages: class and singularities of a plain arch, the minutiae export
//! layout, error tagging, batch ordering and stage caching.

use ridgeprint::tools::synthetic::{arch_pattern, ridge_patch};
use ridgeprint::tools::{export_analysis, load_gray};
use ridgeprint::{
    Analyzer, BitMatrix, FingerprintClass, FingerprintError, Matrix, PipelineParams,
    RidgeBinarizer, Stage, analyze, analyze_image, classify_batch,
};
use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "ridgeprint_{tag}_{}_{sequence}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn is_subset(inner: &BitMatrix, outer: &BitMatrix) -> bool {
    inner.ones().into_iter().all(|(x, y)| outer.get(x, y))
}

#[test]
fn test_arch_end_to_end() {
    init_logging();
    let image = arch_pattern(160, 160);
    let analysis = analyze_image(&image, &PipelineParams::default()).unwrap();

    assert_eq!(analysis.class, FingerprintClass::Arch);
    assert_eq!(analysis.class.to_string(), "arch");
    assert_eq!(analysis.singularities.core_count(), 0);
    assert_eq!(analysis.singularities.delta_count(), 0);

    assert_eq!(analysis.normalized.dimensions(), (160, 160));
    assert_eq!(analysis.skeleton.dimensions(), (160, 160));
    assert!(
        analysis
            .orientation
            .as_slice()
            .iter()
            .all(|&t| (0.0..PI).contains(&t))
    );
    assert!(is_subset(&analysis.filtered, &analysis.roi));
    assert!(is_subset(&analysis.skeleton, &analysis.filtered));
    assert!(analysis.filtered.count_ones() > 0);
    for minutia in &analysis.minutiae {
        assert!(analysis.roi.get(minutia.x, minutia.y));
        assert!(analysis.skeleton.get(minutia.x, minutia.y));
    }
}

#[test]
fn test_minutiae_export_layout() {
    init_logging();
    let analysis = analyze_image(&arch_pattern(128, 128), &PipelineParams::default()).unwrap();
    let json = analysis.minutiae_export().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 2);
    let bifurcations = object["bifurcations"].as_array().unwrap();
    let endings = object["ridgeEndings"].as_array().unwrap();
    assert_eq!(bifurcations.len(), analysis.minutiae_maps.bifurcations.count_ones());
    assert_eq!(endings.len(), analysis.minutiae_maps.ridge_endings.count_ones());
    for record in bifurcations.iter().chain(endings) {
        assert!(record["X"].as_u64().unwrap() < 128);
        assert!(record["Y"].as_u64().unwrap() < 128);
        assert!(record["angle"].as_u64().unwrap() < 180);
    }
}

#[test]
fn test_rgb_buffer_names_failing_stage() {
    let rgb = vec![90u8; 40 * 40 * 3];
    let err = analyze(&rgb, 40, 40).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Normalize));
    assert!(err.to_string().starts_with("normalization failed"), "{err}");
}

#[test]
fn test_zero_budget_trips_first_stage() {
    let params = PipelineParams {
        time_budget_ms: Some(0),
        ..PipelineParams::default()
    };
    let err = analyze_image(&arch_pattern(64, 64), &params).unwrap_err();
    assert!(matches!(
        err,
        FingerprintError::DeadlineExceeded {
            stage: Stage::Normalize
        }
    ));
}

#[test]
fn test_batch_keeps_input_order() {
    let images = vec![
        arch_pattern(64, 64),
        Matrix::filled(8, 8, 100u8),
        arch_pattern(96, 80),
    ];
    let results = classify_batch(&images, &PipelineParams::default());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().singularities.cores.dimensions(), (64, 64));
    assert_eq!(
        results[1].as_ref().unwrap_err().stage(),
        Some(Stage::RegionOfInterest)
    );
    assert_eq!(results[2].as_ref().unwrap().singularities.cores.dimensions(), (96, 80));
}

#[test]
fn test_analyzer_recomputes_only_downstream_stages() {
    init_logging();
    let image = arch_pattern(96, 96);
    let mut analyzer = Analyzer::with_cache(PipelineParams::default());
    let first = analyzer.analyze(&image).unwrap();
    let again = analyzer.analyze(&image).unwrap();
    assert!(Arc::ptr_eq(&first.skeleton, &again.skeleton));

    let mut params = analyzer.params().clone();
    params.binarizer = RidgeBinarizer::Bradley(Default::default());
    analyzer.set_params(params);
    let bradley = analyzer.analyze(&image).unwrap();
    assert!(Arc::ptr_eq(&first.orientation, &bradley.orientation));
    assert!(Arc::ptr_eq(&first.singularities, &bradley.singularities));
    assert!(!Arc::ptr_eq(&first.filtered, &bradley.filtered));
    assert!(is_subset(&bradley.skeleton, &bradley.filtered));
    assert!(is_subset(&bradley.filtered, &bradley.roi));

    // A different image never hits
    let other = analyzer.analyze(&arch_pattern(96, 97)).unwrap();
    assert!(!Arc::ptr_eq(&first.normalized, &other.normalized));
}

#[test]
fn test_background_is_outside_region() {
    let image = ridge_patch(128, 128, 0.4, 8.0);
    let analysis = analyze_image(&image, &PipelineParams::default()).unwrap();
    assert!(!analysis.roi.get(4, 4));
    assert!(analysis.roi.get(64, 64));
    assert!(is_subset(&analysis.filtered, &analysis.roi));
}

#[test]
fn test_stage_export_writes_every_grid() {
    init_logging();
    let analysis = analyze_image(&arch_pattern(64, 64), &PipelineParams::default()).unwrap();
    let dir = temp_dir("export");
    let written = export_analysis(&analysis, &dir).unwrap();
    assert_eq!(written.len(), 8);
    assert!(written.iter().all(|p| p.exists()));

    let normalized = load_gray(&written[0]).unwrap();
    assert_eq!(&normalized, analysis.normalized.as_ref());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_params_file() {
    let dir = temp_dir("params");
    let path = dir.join("params.json");
    std::fs::write(&path, r#"{"classifier": {"loop_slope": 2.5}, "time_budget_ms": 5000}"#).unwrap();
    let params = PipelineParams::load(&path).unwrap();
    assert_eq!(params.classifier.loop_slope, 2.5);
    assert_eq!(params.time_budget_ms, Some(5000));
    assert_eq!(params.roi, PipelineParams::default().roi);
    let _ = std::fs::remove_dir_all(dir);
}
