use nalgebra::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

use crate::Homography;

/// Axis-aligned scale + translation mapping optical pixel coordinates into
/// the thermal frame. This is the model the coarse localizer produces; the
/// capture rigs keep both cameras upright, so it carries no rotation term.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineMap {
    pub scale_x: f64,
    pub scale_y: f64,
    pub translation_x: f64,
    pub translation_y: f64,
}

impl AffineMap {
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            translation_x: 0.0,
            translation_y: 0.0,
        }
    }

    /// Solve the map from two reference point pairs: `optical[i]` must land
    /// on `thermal[i]`. Returns `None` when the optical points share an x or
    /// y coordinate and the scale is undefined.
    pub fn from_point_pairs(optical: &[Point2<f32>; 2], thermal: &[Point2<f32>; 2]) -> Option<Self> {
        let dx = optical[1].x as f64 - optical[0].x as f64;
        let dy = optical[1].y as f64 - optical[0].y as f64;
        if dx.abs() < 1e-9 || dy.abs() < 1e-9 {
            return None;
        }
        let scale_x = (thermal[1].x as f64 - thermal[0].x as f64) / dx;
        let scale_y = (thermal[1].y as f64 - thermal[0].y as f64) / dy;
        Some(Self {
            scale_x,
            scale_y,
            translation_x: thermal[0].x as f64 - scale_x * optical[0].x as f64,
            translation_y: thermal[0].y as f64 - scale_y * optical[0].y as f64,
        })
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        Point2::new(
            (self.scale_x * p.x as f64 + self.translation_x) as f32,
            (self.scale_y * p.y as f64 + self.translation_y) as f32,
        )
    }

    pub fn inverse(&self) -> Option<Self> {
        if self.scale_x.abs() < 1e-12 || self.scale_y.abs() < 1e-12 {
            return None;
        }
        Some(Self {
            scale_x: 1.0 / self.scale_x,
            scale_y: 1.0 / self.scale_y,
            translation_x: -self.translation_x / self.scale_x,
            translation_y: -self.translation_y / self.scale_y,
        })
    }

    pub fn to_homography(&self) -> Homography {
        Homography::new(Matrix3::new(
            self.scale_x,
            0.0,
            self.translation_x,
            0.0,
            self.scale_y,
            self.translation_y,
            0.0,
            0.0,
            1.0,
        ))
    }
}

/// The transform model every stage agrees on: it always maps *optical*
/// coordinates into the *thermal* frame. The coarse path yields the affine
/// variant; feature refinement upgrades it to a full projective map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transform {
    Affine(AffineMap),
    Projective(Homography),
}

impl Transform {
    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        match self {
            Transform::Affine(a) => a.apply(p),
            Transform::Projective(h) => h.apply(p),
        }
    }

    pub fn inverse(&self) -> Option<Transform> {
        match self {
            Transform::Affine(a) => a.inverse().map(Transform::Affine),
            Transform::Projective(h) => h.inverse().map(Transform::Projective),
        }
    }

    pub fn to_homography(&self) -> Homography {
        match self {
            Transform::Affine(a) => a.to_homography(),
            Transform::Projective(h) => *h,
        }
    }

    /// `outer ∘ inner`: applies `inner` first. Two affine maps compose into
    /// an affine map; anything else degrades to projective.
    pub fn compose(outer: &Transform, inner: &Transform) -> Transform {
        match (outer, inner) {
            (Transform::Affine(o), Transform::Affine(i)) => Transform::Affine(AffineMap {
                scale_x: o.scale_x * i.scale_x,
                scale_y: o.scale_y * i.scale_y,
                translation_x: o.scale_x * i.translation_x + o.translation_x,
                translation_y: o.scale_y * i.translation_y + o.translation_y,
            }),
            _ => Transform::Projective(Homography::new(
                outer.to_homography().h * inner.to_homography().h,
            )),
        }
    }
}
