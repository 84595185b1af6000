//! End-to-end correction of full-size tiles with the calibrated instrument

use mirrorfield::{
    build_distortion_correction, build_normalized_correction, build_normalized_corrections,
    min_max_offsets_corners, BoundingInterval, CameraArray, CameraArrayConfig, ConfigError,
    CorrectionMode, DisplacementField, OpticalModel, RealTransform, SamplingStrategy,
};
use nalgebra::Point3;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn cameras() -> CameraArray {
    CameraArray::new(&CameraArrayConfig::default()).unwrap()
}

fn tile_interval() -> BoundingInterval {
    BoundingInterval::new(vec![0.0, 0.0, 0.0], vec![4096.0, 2560.0, 3300.0]).unwrap()
}

#[test]
fn test_corner_normalization_centers_offsets() {
    init_tracing();
    let cams = cameras();
    let model = OpticalModel::new(34886.3436).unwrap();
    let itvl = tile_interval();

    let result = build_normalized_correction(
        0,
        &cams,
        &model,
        CorrectionMode::Remove,
        &itvl,
        SamplingStrategy::Corners,
    )
    .unwrap();

    assert_eq!(result.pipeline.camera(), 1);
    assert!(result.pipeline.is_normalized());

    let before = result.before;
    assert!(before.min.is_finite() && before.max.is_finite());
    // The tile sits off-axis, so removal lowers every corner
    assert!(before.max < 0.0);
    assert!(before.span() > 0.0);

    let after = result.after;
    assert!((after.min + after.max).abs() < 1e-6, "after = {:?}", after);
    assert!((after.span() - before.span()).abs() < 1e-6);

    // The centroid is not a corner. The tile straddles x = 0, so the centroid
    // is shallower than the corner midpoint and keeps a positive residual.
    let to_physical = cams.camera_to_image(1).unwrap();
    let sag = |p: &Point3<f64>| model.distortion().sag(&to_physical.apply(p));
    let corner_sags: Vec<f64> = itvl.corners().unwrap().iter().map(sag).collect();
    let deepest = corner_sags.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let shallowest = corner_sags.iter().cloned().fold(f64::INFINITY, f64::min);

    let centroid = itvl.middle().unwrap();
    let expected = (deepest + shallowest) / 2.0 - sag(&centroid);
    let dz = result.pipeline.apply(&centroid).z - centroid.z;
    assert!((dz - expected).abs() < 1e-6, "centroid displacement {} != {}", dz, expected);
    assert!((dz - 2.094).abs() < 1e-3, "centroid displacement {}", dz);
}

#[test]
fn test_middle_normalization_zeroes_centroid() {
    init_tracing();
    let cams = cameras();
    let model = OpticalModel::calibrated();
    let itvl = tile_interval();

    let result = build_normalized_correction(
        0,
        &cams,
        &model,
        CorrectionMode::Remove,
        &itvl,
        SamplingStrategy::Middle,
    )
    .unwrap();

    let centroid = itvl.middle().unwrap();
    let dz = result.pipeline.apply(&centroid).z - centroid.z;
    assert!(dz.abs() < 1e-6, "centroid displacement {}", dz);
    assert_eq!(result.before.min, result.before.max);
}

#[test]
fn test_simulate_mirrors_remove() {
    let cams = cameras();
    let model = OpticalModel::calibrated();
    let itvl = tile_interval();

    let remove = build_distortion_correction(5, &cams, &model, CorrectionMode::Remove).unwrap();
    let simulate = build_distortion_correction(5, &cams, &model, CorrectionMode::Simulate).unwrap();

    let r = min_max_offsets_corners(&remove, &itvl).unwrap();
    let s = min_max_offsets_corners(&simulate, &itvl).unwrap();
    assert!((r.min + s.max).abs() < 1e-6);
    assert!((r.max + s.min).abs() < 1e-6);

    // Simulating on top of a removal restores the recorded point
    let p = Point3::new(1000.0, 700.0, 1200.0);
    let q = simulate.apply(&remove.apply(&p));
    assert!((q - p).norm() < 1e-6);
}

#[test]
fn test_pipeline_inverse_roundtrip() {
    let cams = cameras();
    let model = OpticalModel::calibrated();
    let result = build_normalized_correction(
        17,
        &cams,
        &model,
        CorrectionMode::Remove,
        &tile_interval(),
        SamplingStrategy::Corners,
    )
    .unwrap();

    let inverse = result.pipeline.inverse().unwrap();
    for p in [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(4096.0, 2560.0, 3300.0),
        Point3::new(2048.0, 1280.0, 1650.0),
    ] {
        let q = inverse.apply(&result.pipeline.apply(&p));
        assert!((q - p).norm() < 1e-6, "{:?} -> {:?}", p, q);
    }
}

#[test]
fn test_batch_covers_every_active_camera() {
    let config = CameraArrayConfig {
        columns_per_camera_group: 13,
        ..Default::default()
    };
    let cams = CameraArray::new(&config).unwrap();
    let model = OpticalModel::calibrated();

    let tiles: Vec<usize> = (0..13 * 4 * 8).step_by(13 * 4).collect();
    let results = build_normalized_corrections(
        &tiles,
        &cams,
        &model,
        CorrectionMode::Remove,
        &tile_interval(),
        SamplingStrategy::Corners,
    )
    .unwrap();

    let seen: Vec<usize> = results.iter().map(|r| r.pipeline.camera()).collect();
    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    for r in &results {
        assert!((r.after.midpoint()).abs() < 1e-6);
    }
}

#[test]
fn test_columns_13_addressing() {
    let config = CameraArrayConfig {
        columns_per_camera_group: 13,
        ..Default::default()
    };
    let cams = CameraArray::new(&config).unwrap();

    assert_eq!(cams.camera_id(0), 1);
    assert_eq!(cams.camera_id(51), 1);
    let a = cams.address(52);
    assert_eq!((a.row, a.column, a.camera), (4, 0, 2));
}

#[test]
fn test_empty_camera_list_is_rejected() {
    let config = CameraArrayConfig {
        active_cameras: vec![],
        ..Default::default()
    };
    assert_eq!(CameraArray::new(&config).unwrap_err(), ConfigError::NoActiveCameras);
}

#[test]
fn test_normalized_field_is_centered() {
    let cams = cameras();
    let model = OpticalModel::calibrated();
    let itvl = tile_interval();
    let result = build_normalized_correction(
        0,
        &cams,
        &model,
        CorrectionMode::Remove,
        &itvl,
        SamplingStrategy::Corners,
    )
    .unwrap();

    let field = DisplacementField::sample(&result.pipeline, &itvl, [512.0, 512.0, 1100.0]).unwrap();
    let stats = field.stats().unwrap();
    assert_eq!(field.shape(), [9, 6, 4]);
    assert_eq!(stats.count, 9 * 6 * 4);
    // Deepest correction is at a far corner, which is on the lattice
    assert!((stats.min - result.after.min).abs() < 1e-6);
    // The tile straddles x = 0, where the lattice finds a shallower point than any corner
    assert!(stats.max > result.after.max);
    assert!(stats.max - result.after.max < 0.1 * result.before.span());
}
