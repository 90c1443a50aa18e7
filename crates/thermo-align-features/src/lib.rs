//! Fine registration between thermal and optical edge maps.
//!
//! The pipeline is a compact ORB-style chain: segment-test corners with
//! intensity-centroid orientations, 256-bit binary descriptors sampled from
//! a softened copy of the edge map, mutual nearest-neighbor matching, and a
//! seeded RANSAC homography fit. Everything downstream of the edge maps is
//! deterministic for identical inputs.

pub mod brief;
pub mod error;
pub mod fast;
pub mod matching;
pub mod params;
pub mod ransac;

use nalgebra::Point2;
use thermo_align_core::{GrayImageView, Homography};

pub use brief::{describe, Descriptor, DESCRIPTOR_BYTES};
pub use error::RegisterError;
pub use fast::{detect_keypoints, Keypoint};
pub use matching::{hamming, match_descriptors, KeypointMatch};
pub use params::{FeatureParams, RansacParams, RegionMask};
pub use ransac::{ransac_homography, RansacFit};

/// Binary edge maps are a hostile texture for pairwise intensity tests, so
/// descriptors are sampled from a blurred copy instead.
const DESCRIBE_BLUR_SIGMA: f32 = 2.0;

/// Outcome of feature-based registration, mapping optical pixels into the
/// thermal frame.
#[derive(Clone, Debug)]
pub struct Registration {
    pub homography: Homography,
    /// Matches that survived the mutual check and the retain cut.
    pub match_count: usize,
    pub inlier_count: usize,
    /// Inliers over retained matches.
    pub inlier_ratio: f32,
    /// Set when the consensus is too thin to trust the projective terms.
    pub ill_conditioned: bool,
}

fn keypoints_and_descriptors(
    edges: &GrayImageView<'_>,
    params: &FeatureParams,
) -> (Vec<Keypoint>, Vec<Descriptor>) {
    let kps = detect_keypoints(edges, params);
    let soft = thermo_align_edges::gaussian_blur(edges, DESCRIBE_BLUR_SIGMA);
    let view = soft.as_view();
    let descs = kps.iter().map(|kp| describe(&view, kp)).collect();
    (kps, descs)
}

/// Estimate the optical-to-thermal homography from a pair of edge maps.
///
/// Steps: detect corners in both maps, describe them, match with a mutual
/// nearest-neighbor check, keep the best `retain_fraction` of matches, then
/// fit a homography with seeded RANSAC. Fewer than four retained matches is
/// an error; a thin consensus is reported through `ill_conditioned` rather
/// than failing, since the caller may still prefer it over nothing.
pub fn register(
    optical_edges: &GrayImageView<'_>,
    thermal_edges: &GrayImageView<'_>,
    params: &FeatureParams,
) -> Result<Registration, RegisterError> {
    // 1) corners and descriptors on both frames
    let (kp_o, d_o) = keypoints_and_descriptors(optical_edges, params);
    let (kp_t, d_t) = keypoints_and_descriptors(thermal_edges, params);
    log::debug!(
        "keypoints: optical {}, thermal {}",
        kp_o.len(),
        kp_t.len()
    );

    // 2) mutual matches, best first
    let mut matches = match_descriptors(&d_o, &d_t);

    // 3) drop the tail of the distance ranking
    let keep = (matches.len() as f32 * params.retain()).floor() as usize;
    matches.truncate(keep);

    if matches.len() < 4 {
        return Err(RegisterError::InsufficientMatches {
            found: matches.len(),
            needed: 4,
        });
    }

    // 4) robust fit, optical -> thermal
    let src: Vec<Point2<f32>> = matches
        .iter()
        .map(|m| Point2::new(kp_o[m.query].x, kp_o[m.query].y))
        .collect();
    let dst: Vec<Point2<f32>> = matches
        .iter()
        .map(|m| Point2::new(kp_t[m.train].x, kp_t[m.train].y))
        .collect();
    let fit = ransac_homography(&src, &dst, &params.ransac)?;

    let inlier_ratio = fit.inlier_count as f32 / matches.len() as f32;
    let ill_conditioned = fit.inlier_count < params.ransac.min_well_conditioned;
    log::info!(
        "registration: {} matches, {} inliers ({:.0}%){}",
        matches.len(),
        fit.inlier_count,
        inlier_ratio * 100.0,
        if ill_conditioned { ", ill-conditioned" } else { "" }
    );

    Ok(Registration {
        homography: fit.homography,
        match_count: matches.len(),
        inlier_count: fit.inlier_count,
        inlier_ratio,
        ill_conditioned,
    })
}
