use serde::{Deserialize, Serialize};

/// Restricts keypoint detection to a sub-region of the frame. Coordinates
/// stay in full-image space, so no offset bookkeeping is needed downstream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionMask {
    #[default]
    Full,
    /// Rigs that mount the thermal head above the optical one only overlap
    /// in the upper half of the frame.
    UpperHalf,
    /// Side-by-side rigs only overlap in the right half.
    RightHalf,
}

impl RegionMask {
    #[inline]
    pub fn contains(&self, x: usize, y: usize, width: usize, height: usize) -> bool {
        match self {
            RegionMask::Full => true,
            RegionMask::UpperHalf => y < height / 2,
            RegionMask::RightHalf => x >= width / 2,
        }
    }
}

/// Configuration for the robust homography fit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RansacParams {
    /// Number of minimal-sample iterations.
    pub iterations: usize,
    /// Forward reprojection error, in pixels, below which a correspondence
    /// counts as an inlier.
    pub inlier_threshold: f32,
    /// Seed for the sample draws. Fixed by default so a rerun over the same
    /// pair reproduces the same transform bit for bit.
    pub seed: u64,
    /// Fits supported by fewer inliers than this are flagged as
    /// ill-conditioned in the quality report.
    pub min_well_conditioned: usize,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            iterations: 512,
            inlier_threshold: 3.0,
            seed: 271_828,
            min_well_conditioned: 10,
        }
    }
}

/// Configuration for feature-based registration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureParams {
    /// Keypoint cap per image; the strongest responses survive.
    pub max_keypoints: usize,
    /// Minimum center-to-ring intensity difference for the segment test.
    pub fast_threshold: u8,
    /// Required contiguous arc length on the 16-pixel ring.
    pub fast_arc: usize,
    /// Minimum distance between surviving keypoints, in pixels.
    pub nms_distance: f32,
    /// Patch side for the intensity-centroid orientation estimate.
    pub orientation_patch: usize,
    /// Fraction of matches kept after sorting by descriptor distance.
    pub retain_fraction: f32,
    /// Detection region applied to both images.
    pub region: RegionMask,
    pub ransac: RansacParams,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            max_keypoints: 400,
            fast_threshold: 20,
            fast_arc: 12,
            nms_distance: 4.0,
            orientation_patch: 15,
            retain_fraction: 0.9,
            region: RegionMask::Full,
            ransac: RansacParams::default(),
        }
    }
}

impl FeatureParams {
    /// Retain fraction clamped to a sane range; 0 would discard everything,
    /// so the floor keeps at least some matches flowing.
    pub(crate) fn retain(&self) -> f32 {
        self.retain_fraction.clamp(0.05, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_masks_partition_the_frame() {
        assert!(RegionMask::Full.contains(0, 0, 10, 10));
        assert!(RegionMask::UpperHalf.contains(9, 4, 10, 10));
        assert!(!RegionMask::UpperHalf.contains(9, 5, 10, 10));
        assert!(RegionMask::RightHalf.contains(5, 9, 10, 10));
        assert!(!RegionMask::RightHalf.contains(4, 9, 10, 10));
    }
}
