use serde::{Deserialize, Serialize};

/// Configuration for the descending scale sweep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScaleSearchParams {
    /// Smallest target scale to try.
    pub min_scale: f32,
    /// Largest target scale to try; the sweep starts here and descends, so
    /// equal scores resolve to the larger scale.
    pub max_scale: f32,
    /// Number of evenly spaced scale steps across the range.
    pub steps: usize,
    /// Minimum peak score for the coarse stage to count as confident. The
    /// session still proceeds below this, it just flags the result.
    pub min_score: f32,
}

impl Default for ScaleSearchParams {
    fn default() -> Self {
        Self {
            min_scale: 0.45,
            max_scale: 1.0,
            steps: 60,
            min_score: 0.25,
        }
    }
}

impl ScaleSearchParams {
    /// The descending scale ladder. A single step degenerates to
    /// `max_scale`; an empty ladder is never produced for `steps > 0`.
    pub fn scales(&self) -> Vec<f32> {
        if self.steps == 0 {
            return Vec::new();
        }
        if self.steps == 1 {
            return vec![self.max_scale];
        }
        let span = self.max_scale - self.min_scale;
        let denom = (self.steps - 1) as f32;
        (0..self.steps)
            .map(|i| self.max_scale - span * (i as f32 / denom))
            .collect()
    }
}

/// Optional hints from capture metadata. Both hints narrow the search; the
/// sweep still validates the result, so a bad hint costs accuracy, not a
/// crash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchPrior {
    /// Expected target scale; the sweep is restricted to +- `scale_window`
    /// around it.
    pub scale_hint: Option<f32>,
    /// Half-width of the scale window applied around `scale_hint`.
    #[serde(default = "default_scale_window")]
    pub scale_window: f32,
    /// Expected template position in full-resolution target pixels.
    pub offset_hint: Option<(f32, f32)>,
    /// Half-width, in full-resolution pixels, of the scan window centred on
    /// `offset_hint`.
    #[serde(default = "default_offset_window")]
    pub offset_window: f32,
}

impl Default for SearchPrior {
    fn default() -> Self {
        Self {
            scale_hint: None,
            scale_window: default_scale_window(),
            offset_hint: None,
            offset_window: default_offset_window(),
        }
    }
}

fn default_scale_window() -> f32 {
    0.1
}

fn default_offset_window() -> f32 {
    48.0
}
