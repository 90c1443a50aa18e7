//! Manual two-point refinement input.

use nalgebra::Point2;
use thermo_align_core::AffineMap;

/// One correspondence: the same physical feature in each frame.
#[derive(Clone, Copy, Debug)]
pub struct PointPair {
    pub optical: Point2<f32>,
    pub thermal: Point2<f32>,
}

/// Supplies the two correspondences for manual affine refinement.
///
/// Interactive frontends wire their picker in here; tests and scripted runs
/// use [`PresetPairs`]. `None` means the operator declined, and the session
/// keeps the coarse transform.
pub trait PointPairSource {
    fn point_pairs(&mut self) -> Option<[PointPair; 2]>;
}

/// Pairs handed in up front.
pub struct PresetPairs(pub Option<[PointPair; 2]>);

impl PointPairSource for PresetPairs {
    fn point_pairs(&mut self) -> Option<[PointPair; 2]> {
        self.0
    }
}

/// Solve the axis-aligned affine from two correspondences. `None` when the
/// points coincide along either axis.
pub fn affine_from_pairs(pairs: &[PointPair; 2]) -> Option<AffineMap> {
    AffineMap::from_point_pairs(
        &[pairs[0].optical, pairs[1].optical],
        &[pairs[0].thermal, pairs[1].thermal],
    )
}
