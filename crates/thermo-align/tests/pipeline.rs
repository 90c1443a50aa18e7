//! File-to-file pipeline tests on synthetic speckle pairs.

#![cfg(feature = "image")]

use std::fs;
use std::path::Path;

use approx::assert_abs_diff_eq;
use nalgebra::Point2;

use thermo_align::batch::{discover_pairs, run_batch, BatchOptions, BatchSummary};
use thermo_align::core::{crop_gray, resize_to_width, GrayImage};
use thermo_align::run::{align_pair, to_image_gray, PairOutputs};
use thermo_align::session::{AutoConfirm, PipelineConfig, RefineStrategy, TransformRecord};
use thermo_align::Transform;

/// Deterministic field of bright square dots on black; `stamp` is the dot
/// side in pixels. Dots of 2px and up survive the pre-gradient smoothing,
/// so the same scene works for both the correlation and the feature stages.
fn speckle(width: usize, height: usize, stamp: usize, seed: u64) -> GrayImage {
    let mut img = GrayImage::new(width, height);
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    let count = width * height / (12 * stamp * stamp);
    for _ in 0..count {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let x = ((state >> 33) % (width - stamp + 1) as u64) as usize;
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let y = ((state >> 33) % (height - stamp + 1) as u64) as usize;
        for dy in 0..stamp {
            for dx in 0..stamp {
                img.set(x + dx, y + dy, 255);
            }
        }
    }
    img
}

fn save_png(img: &GrayImage, path: &Path) {
    to_image_gray(img).save(path).expect("encode png");
}

fn write_pair(dir: &Path, base: &str, thermal: &GrayImage, optical: &GrayImage) {
    save_png(thermal, &dir.join(format!("{base}_thermal.png")));
    save_png(optical, &dir.join(format!("{base}_optical.png")));
}

fn lenient_confirm() -> AutoConfirm {
    AutoConfirm {
        min_confidence: 0.1,
    }
}

#[test]
fn downscaled_thermal_window_is_located_in_the_optical_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    // 4px dots stay above the edge thresholds after the 0.6x downsample
    let optical = speckle(240, 180, 4, 9001);
    let window = crop_gray(&optical.as_view(), 75, 56, 66, 50);
    // 40/66 = 0.606, inside the configured ladder
    let thermal = resize_to_width(&window.as_view(), 40);
    assert_eq!((thermal.width, thermal.height), (40, 30));
    write_pair(dir.path(), "scene", &thermal, &optical);

    let mut config = PipelineConfig::default();
    config.search.min_scale = 0.58;
    config.search.max_scale = 0.64;
    config.search.steps = 4;
    config.search.min_score = 0.1;
    config.refine = RefineStrategy::None;

    let outputs = PairOutputs::for_base(dir.path(), "scene", "png");
    let result = align_pair(
        &dir.path().join("scene_thermal.png"),
        &dir.path().join("scene_optical.png"),
        &config,
        None,
        None,
        &mut lenient_confirm(),
        &outputs,
    )
    .expect("pipeline");

    assert_eq!(result.attempts, 1);
    assert!(!result.used_fallback);
    assert!(result.quality.score > 0.2, "score {}", result.quality.score);

    let bbox = result.coarse.bbox;
    assert!((72..=78).contains(&bbox.x), "bbox {bbox:?}");
    assert!((53..=59).contains(&bbox.y), "bbox {bbox:?}");
    assert!((62..=69).contains(&bbox.width), "bbox {bbox:?}");
    assert!((46..=53).contains(&bbox.height), "bbox {bbox:?}");

    assert!(outputs.all_exist());
    let aligned = image::open(&outputs.aligned).expect("decode aligned");
    assert_eq!((aligned.width(), aligned.height()), (40, 30));
    let side = image::open(&outputs.sidebyside).expect("decode sidebyside");
    assert_eq!((side.width(), side.height()), (80, 30));

    let v: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&outputs.transform).expect("read record"))
            .expect("parse record");
    assert_eq!(v["type"], "affine");
    assert!(v["quality"]["score"].as_f64().expect("score") > 0.2);
}

#[test]
fn full_resolution_pair_refines_to_a_projective_transform() {
    let dir = tempfile::tempdir().expect("tempdir");
    let optical = speckle(160, 120, 2, 31337);
    let thermal = crop_gray(&optical.as_view(), 30, 25, 80, 60);
    write_pair(dir.path(), "lab", &thermal, &optical);

    let mut config = PipelineConfig::default();
    config.search.min_scale = 0.9;
    config.search.max_scale = 1.0;
    config.search.steps = 2;
    config.search.min_score = 0.1;
    // square speckle blobs subtend corner arcs just under the default 12
    config.features.fast_arc = 10;

    let outputs = PairOutputs::for_base(dir.path(), "lab", "png");
    let result = align_pair(
        &dir.path().join("lab_thermal.png"),
        &dir.path().join("lab_optical.png"),
        &config,
        None,
        None,
        &mut lenient_confirm(),
        &outputs,
    )
    .expect("pipeline");

    assert!(!result.used_fallback);
    assert!(
        result.quality.inliers >= 10,
        "inliers {}",
        result.quality.inliers
    );
    assert!(!result.quality.ill_conditioned);

    let record = TransformRecord::load_json(&outputs.transform).expect("record");
    let transform = record.transform.to_transform();
    assert!(matches!(transform, Transform::Projective(_)));

    // the thermal frame is the optical window at (30,25)
    let mapped = transform.apply(Point2::new(60.0, 50.0));
    assert_abs_diff_eq!(mapped.x, 30.0, epsilon = 1.5);
    assert_abs_diff_eq!(mapped.y, 25.0, epsilon = 1.5);
    assert_eq!(record.quality.inliers, result.quality.inliers);
}

#[test]
fn reruns_write_bit_identical_transform_records() {
    let scene_dir = tempfile::tempdir().expect("tempdir");
    let optical = speckle(120, 90, 2, 4242);
    let thermal = crop_gray(&optical.as_view(), 30, 20, 60, 45);
    write_pair(scene_dir.path(), "rep", &thermal, &optical);

    let mut config = PipelineConfig::default();
    config.search.min_scale = 0.9;
    config.search.max_scale = 1.0;
    config.search.steps = 2;
    config.search.min_score = 0.1;
    config.features.fast_arc = 10;

    let mut records = Vec::new();
    for _ in 0..2 {
        let out_dir = tempfile::tempdir().expect("tempdir");
        let outputs = PairOutputs::for_base(out_dir.path(), "rep", "png");
        align_pair(
            &scene_dir.path().join("rep_thermal.png"),
            &scene_dir.path().join("rep_optical.png"),
            &config,
            None,
            None,
            &mut lenient_confirm(),
            &outputs,
        )
        .expect("pipeline");
        records.push(fs::read(&outputs.transform).expect("read record"));
    }
    assert_eq!(records[0], records[1]);
}

#[test]
fn starved_refinement_is_reported_as_a_batch_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let optical = speckle(120, 90, 2, 777);
    let thermal = crop_gray(&optical.as_view(), 30, 20, 60, 45);
    write_pair(dir.path(), "cold", &thermal, &optical);

    let mut config = PipelineConfig::default();
    config.search.min_scale = 0.9;
    config.search.max_scale = 1.0;
    config.search.steps = 2;
    config.search.min_score = 0.1;
    config.min_confidence = 0.1;
    // two keypoints can never produce a four-point consensus
    config.features.max_keypoints = 2;

    let pairs = discover_pairs(dir.path()).expect("discover");
    assert_eq!(pairs.len(), 1);

    let summary = run_batch(
        &pairs,
        &config,
        &BatchOptions {
            out_dir: dir.path().to_path_buf(),
            force: false,
        },
    );
    assert_eq!(
        summary,
        BatchSummary {
            aligned: 0,
            fallback: 1,
            skipped: 0
        }
    );

    let record =
        TransformRecord::load_json(dir.path().join("cold_transform.json")).expect("record");
    assert!(matches!(record.transform.to_transform(), Transform::Affine(_)));
    assert!(record.quality.ill_conditioned);
}
