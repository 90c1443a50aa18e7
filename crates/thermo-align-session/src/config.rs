//! JSON pipeline configuration.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use thermo_align_coarse::ScaleSearchParams;
use thermo_align_edges::EdgeParams;
use thermo_align_features::FeatureParams;

use crate::error::SessionIoError;
use crate::session::RefineStrategy;

fn default_blend_alpha() -> f32 {
    0.5
}

fn default_min_confidence() -> f32 {
    0.25
}

fn default_max_attempts() -> usize {
    3
}

/// Aggregate configuration for one alignment run.
///
/// Every section is optional in the JSON; missing sections take the same
/// defaults the library uses, so `{}` is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Edge extraction for the thermal template.
    #[serde(default = "EdgeParams::for_template")]
    pub template_edges: EdgeParams,
    /// Edge extraction for the optical target.
    #[serde(default = "EdgeParams::for_target")]
    pub target_edges: EdgeParams,
    #[serde(default)]
    pub search: ScaleSearchParams,
    #[serde(default)]
    pub features: FeatureParams,
    #[serde(default)]
    pub refine: RefineStrategy,
    /// Overlay weight for the blended composite.
    #[serde(default = "default_blend_alpha")]
    pub blend_alpha: f32,
    /// Automatic acceptance floor on the coarse correlation score.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// Attempt cap; every retry widens the search deterministically.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            template_edges: EdgeParams::for_template(),
            target_edges: EdgeParams::for_target(),
            search: ScaleSearchParams::default(),
            features: FeatureParams::default(),
            refine: RefineStrategy::default(),
            blend_alpha: default_blend_alpha(),
            min_confidence: default_min_confidence(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SessionIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SessionIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
