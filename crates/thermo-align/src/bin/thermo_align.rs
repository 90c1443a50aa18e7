//! Command-line front end: `align` for one pair, `batch` for a directory.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};

#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
#[cfg(not(feature = "tracing"))]
use thermo_align::core::init_with_level;
#[cfg(feature = "tracing")]
use tracing_log::LogTracer;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

use thermo_align::batch::{discover_pairs, pair_base, run_batch, BatchOptions};
use thermo_align::run::{align_pair, PairOutputs};
use thermo_align::session::{AutoConfirm, ConfirmationProvider, PipelineConfig, StdinConfirm};
use thermo_align::SearchPrior;

#[derive(Parser, Debug)]
#[command(name = "thermo-align", version, about = "Register thermal frames onto optical frames")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Pipeline configuration JSON; built-in defaults when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Align one thermal/optical pair and write the artifacts.
    Align {
        /// Thermal frame (the template side).
        thermal: PathBuf,
        /// Optical frame (the search side).
        optical: PathBuf,
        /// Output directory; defaults to the thermal frame's directory.
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Expected thermal-in-optical scale from capture metadata.
        #[arg(long)]
        scale_hint: Option<f32>,
        /// Expected template position, "x,y" in optical pixels.
        #[arg(long, value_parser = parse_offset)]
        offset_hint: Option<(f32, f32)>,
        /// Review each alignment on stdin instead of auto-accepting.
        #[arg(short, long)]
        interactive: bool,
        /// Overwrite existing artifacts.
        #[arg(short, long)]
        force: bool,
    },
    /// Align every `<base>_thermal.<ext>` / `<base>_optical.<ext>` pair in a
    /// directory.
    Batch {
        /// Directory scanned for pairs.
        dir: PathBuf,
        /// Output directory; defaults to the scanned directory.
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Overwrite existing artifacts.
        #[arg(short, long)]
        force: bool,
    },
}

fn parse_offset(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got {s:?}"))?;
    let x: f32 = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y: f32 = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok((x, y))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    #[cfg(not(feature = "tracing"))]
    {
        let level = match cli.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        init_with_level(level)?;
    }
    #[cfg(feature = "tracing")]
    {
        // route log records from the library crates into the subscriber
        let _ = LogTracer::init();
        let default = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    let config = match &cli.config {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Command::Align {
            thermal,
            optical,
            out_dir,
            scale_hint,
            offset_hint,
            interactive,
            force,
        } => align_cmd(
            &config,
            &thermal,
            &optical,
            out_dir,
            scale_hint,
            offset_hint,
            interactive,
            force,
        ),
        Command::Batch {
            dir,
            out_dir,
            force,
        } => batch_cmd(&config, dir, out_dir, force),
    }
}

#[allow(clippy::too_many_arguments)]
fn align_cmd(
    config: &PipelineConfig,
    thermal: &Path,
    optical: &Path,
    out_dir: Option<PathBuf>,
    scale_hint: Option<f32>,
    offset_hint: Option<(f32, f32)>,
    interactive: bool,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = out_dir
        .or_else(|| thermal.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let base = pair_base(thermal);
    let ext = thermal
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png");
    let outputs = PairOutputs::for_base(&dir, &base, ext);
    if !force && outputs.all_exist() {
        println!("{base}: artifacts exist, pass --force to re-align");
        return Ok(());
    }

    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("align", pair = %base).entered();

    let prior = (scale_hint.is_some() || offset_hint.is_some()).then(|| SearchPrior {
        scale_hint,
        offset_hint,
        ..SearchPrior::default()
    });

    let mut auto = AutoConfirm {
        min_confidence: config.min_confidence,
    };
    let mut stdin = StdinConfirm;
    let confirm: &mut dyn ConfirmationProvider = if interactive { &mut stdin } else { &mut auto };

    let result = align_pair(
        thermal,
        optical,
        config,
        prior.as_ref(),
        None,
        confirm,
        &outputs,
    )?;

    let tag = if result.used_fallback {
        " (coarse fallback)"
    } else {
        ""
    };
    println!(
        "{base}: score {:.3}, {} inliers, {} attempt(s){tag}",
        result.quality.score, result.quality.inliers, result.attempts
    );
    println!("wrote {}", outputs.transform.display());
    Ok(())
}

fn batch_cmd(
    config: &PipelineConfig,
    dir: PathBuf,
    out_dir: Option<PathBuf>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pairs = discover_pairs(&dir)?;
    if pairs.is_empty() {
        println!("no pairs found in {}", dir.display());
        return Ok(());
    }

    let opts = BatchOptions {
        out_dir: out_dir.unwrap_or(dir),
        force,
    };
    let summary = run_batch(&pairs, config, &opts);
    println!(
        "aligned {}, fallback {}, skipped {}",
        summary.aligned, summary.fallback, summary.skipped
    );
    Ok(())
}
