//! Directory-level batch driver.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::run::{align_pair, PairOutputs};
use crate::session::{AutoConfirm, PipelineConfig};

/// One discovered thermal/optical pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairEntry {
    pub base: String,
    pub thermal: PathBuf,
    pub optical: PathBuf,
    pub ext: String,
}

/// Counts reported at the end of a batch run. Per-pair failures are logged
/// and counted as skipped; they never abort the batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub aligned: usize,
    pub fallback: usize,
    pub skipped: usize,
}

#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub out_dir: PathBuf,
    /// Re-align pairs whose artifacts already exist.
    pub force: bool,
}

/// The `<base>` of a `<base>_thermal.<ext>` path; falls back to the bare
/// file stem for inputs that do not follow the naming scheme.
pub fn pair_base(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    stem.strip_suffix("_thermal").unwrap_or(stem).to_string()
}

/// Scan a directory for `<base>_thermal.<ext>` / `<base>_optical.<ext>`
/// pairs. Thermal frames without a matching optical sibling are logged and
/// dropped. The result is sorted by base name, so batch order is stable.
pub fn discover_pairs(dir: &Path) -> std::io::Result<Vec<PairEntry>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let mut pairs = Vec::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(base) = stem.strip_suffix("_thermal") else {
            continue;
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_string();
        let optical = dir.join(format!("{base}_optical.{ext}"));
        if optical.is_file() {
            pairs.push(PairEntry {
                base: base.to_string(),
                thermal: path,
                optical,
                ext,
            });
        } else {
            log::warn!("no optical frame for {}", path.display());
        }
    }
    Ok(pairs)
}

enum Outcome {
    Aligned,
    Fallback,
    Skipped,
}

/// Align every pair, in parallel, with automatic confirmation.
///
/// Pairs whose artifacts already exist are skipped unless `force` is set.
/// Each pair runs its own sequential pipeline; only the pair loop fans out,
/// so per-pair results are identical to a serial run.
pub fn run_batch(
    pairs: &[PairEntry],
    config: &PipelineConfig,
    opts: &BatchOptions,
) -> BatchSummary {
    let outcomes: Vec<Outcome> = pairs
        .par_iter()
        .map(|pair| {
            let outputs = PairOutputs::for_base(&opts.out_dir, &pair.base, &pair.ext);
            if !opts.force && outputs.all_exist() {
                log::info!("{}: artifacts exist, skipping", pair.base);
                return Outcome::Skipped;
            }
            let mut confirm = AutoConfirm {
                min_confidence: config.min_confidence,
            };
            match align_pair(
                &pair.thermal,
                &pair.optical,
                config,
                None,
                None,
                &mut confirm,
                &outputs,
            ) {
                Ok(result) if result.used_fallback => Outcome::Fallback,
                Ok(_) => Outcome::Aligned,
                Err(err) => {
                    log::error!("{}: {err}", pair.base);
                    Outcome::Skipped
                }
            }
        })
        .collect();

    let mut summary = BatchSummary::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Aligned => summary.aligned += 1,
            Outcome::Fallback => summary.fallback += 1,
            Outcome::Skipped => summary.skipped += 1,
        }
    }
    log::info!(
        "batch done: {} aligned, {} fallback, {} skipped",
        summary.aligned,
        summary.fallback,
        summary.skipped
    );
    summary
}
