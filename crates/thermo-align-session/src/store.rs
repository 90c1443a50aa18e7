//! Persisted transform records.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use thermo_align_core::{Homography, Transform};

use crate::error::SessionIoError;

/// Quality of an accepted alignment, stored alongside the transform.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct QualityReport {
    /// Coarse correlation score at the winning scale.
    pub score: f32,
    /// RANSAC inliers behind the refined fit; zero for coarse-only results.
    pub inliers: usize,
    pub inlier_ratio: f32,
    /// Thin consensus, or a refinement fallback. Downstream consumers
    /// should treat the projective terms with suspicion.
    pub ill_conditioned: bool,
}

/// Serialized transform, tagged by kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformRepr {
    Affine(thermo_align_core::AffineMap),
    Projective { matrix: [[f64; 3]; 3] },
}

impl TransformRepr {
    pub fn from_transform(t: &Transform) -> Self {
        match t {
            Transform::Affine(a) => TransformRepr::Affine(*a),
            Transform::Projective(h) => TransformRepr::Projective {
                matrix: h.to_array(),
            },
        }
    }

    pub fn to_transform(&self) -> Transform {
        match self {
            TransformRepr::Affine(a) => Transform::Affine(*a),
            TransformRepr::Projective { matrix } => {
                Transform::Projective(Homography::from_array(*matrix))
            }
        }
    }
}

/// One record per accepted pair, written next to the composites.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransformRecord {
    #[serde(flatten)]
    pub transform: TransformRepr,
    pub quality: QualityReport,
}

impl TransformRecord {
    pub fn new(transform: &Transform, quality: QualityReport) -> Self {
        Self {
            transform: TransformRepr::from_transform(transform),
            quality,
        }
    }

    /// Load a record from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SessionIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this record to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SessionIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermo_align_core::AffineMap;

    fn quality() -> QualityReport {
        QualityReport {
            score: 0.83,
            inliers: 42,
            inlier_ratio: 0.7,
            ill_conditioned: false,
        }
    }

    #[test]
    fn affine_records_use_flat_named_fields() {
        let t = Transform::Affine(AffineMap {
            scale_x: 0.5,
            scale_y: 0.55,
            translation_x: -20.0,
            translation_y: -15.0,
        });
        let v = serde_json::to_value(TransformRecord::new(&t, quality())).unwrap();
        assert_eq!(v["type"], "affine");
        assert!((v["scale_x"].as_f64().unwrap() - 0.5).abs() < 1e-9);
        assert!((v["translation_y"].as_f64().unwrap() + 15.0).abs() < 1e-9);
        assert_eq!(v["quality"]["inliers"], 42);
    }

    #[test]
    fn projective_records_carry_the_full_matrix() {
        let h = Homography::from_array([[1.0, 0.0, 7.0], [0.0, 1.0, 5.0], [0.0, 0.0, 1.0]]);
        let v = serde_json::to_value(TransformRecord::new(&Transform::Projective(h), quality()))
            .unwrap();
        assert_eq!(v["type"], "projective");
        assert_eq!(v["matrix"][0][2], 7.0);
        assert_eq!(v["matrix"][2][2], 1.0);
    }

    #[test]
    fn record_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair_transform.json");

        let h = Homography::from_array([[1.1, 0.01, 3.0], [-0.02, 0.95, 4.5], [1e-5, 0.0, 1.0]]);
        let record = TransformRecord::new(&Transform::Projective(h), quality());
        record.write_json(&path).unwrap();

        let back = TransformRecord::load_json(&path).unwrap();
        assert_eq!(back.transform, record.transform);
        assert_eq!(back.quality.inliers, 42);
        match back.transform.to_transform() {
            Transform::Projective(hh) => assert_eq!(hh.to_array(), h.to_array()),
            other => panic!("wrong kind: {other:?}"),
        }
    }
}
