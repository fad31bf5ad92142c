//! Command-line front end for the strand growth pipeline.
//!
//! Builds a [`PipelineConfig`] from presets or a JSON file, runs it against
//! a scene loaded from disk (or a generated demo scene) and prints a
//! per-run summary. All batch logic lives in [`runner::Runner`].

mod runner;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use strand_core::{PipelineConfig, Preset};
use tracing_subscriber::EnvFilter;

use runner::Runner;

/// Multiply guide curves into animated, growing instances.
#[derive(Parser, Debug)]
#[command(name = "strand", version, about, long_about = None)]
struct Cli {
    /// Log pipeline steps per instance
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the built-in presets
    Presets,

    /// Run presets or a configuration file against a scene
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Preset to run; repeatable. All presets when neither this nor --config is given
    #[arg(short, long = "preset")]
    presets: Vec<String>,

    /// JSON pipeline configuration
    #[arg(short, long, conflicts_with = "presets")]
    config: Option<PathBuf>,

    /// JSON scene with guides and meshes; a demo scene is generated when absent
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Base seed; overrides the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Copies per guide for every run
    #[arg(long)]
    copies: Option<usize>,

    /// Write registered instances as JSON
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Presets => {
            print_presets();
            Ok(())
        }
        Commands::Run(args) => run(args),
    }
}

/// Runs the batch and prints its summary. Fails when any run aborted.
fn run(args: RunArgs) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::from_presets(&resolve_presets(&args.presets)?),
    };
    if let Some(seed) = args.seed {
        cfg.seed = Some(seed);
    }
    if let Some(copies) = args.copies {
        for run in &mut cfg.runs {
            run.copies_per_guide = copies;
        }
    }

    let mut runner = match &args.scene {
        Some(path) => Runner::from_scene_file(path)?,
        None => Runner::with_demo_scene(&cfg, cfg.seed.unwrap_or_default()),
    };
    let report = runner.run(cfg);
    runner.print_summary(&report);

    if let Some(path) = &args.out {
        runner.dump(path)?;
    }

    let aborted: Vec<&str> = report.failed_runs().map(|(name, _)| name).collect();
    if !aborted.is_empty() {
        bail!(
            "{} of {} runs aborted: {}",
            aborted.len(),
            report.runs.len(),
            aborted.join(", ")
        );
    }
    Ok(())
}

fn print_presets() {
    for preset in Preset::ALL {
        let cfg = preset.config();
        println!(
            "{:<26} {} -> {}  x{}",
            preset.name(),
            cfg.source.collection(),
            cfg.destination.as_deref().unwrap_or("<active>"),
            cfg.copies_per_guide
        );
    }
}

fn resolve_presets(names: &[String]) -> Result<Vec<Preset>> {
    if names.is_empty() {
        return Ok(Preset::ALL.to_vec());
    }
    names
        .iter()
        .map(|n| match Preset::from_name(n) {
            Some(p) => Ok(p),
            None => bail!("unknown preset `{n}`; run `strand presets` for the list"),
        })
        .collect()
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_batch_succeeds() {
        let args = RunArgs {
            presets: vec!["bevel-growth".into(), "polygon-edge-curves".into()],
            seed: Some(9),
            copies: Some(1),
            ..RunArgs::default()
        };
        run(args).unwrap();
    }

    #[test]
    fn aborted_runs_fail_the_command() {
        let path = std::env::temp_dir().join("strand_empty_scene_test.json");
        std::fs::write(&path, "{}").unwrap();
        let args = RunArgs {
            presets: vec!["extrude-growth".into()],
            scene: Some(path.clone()),
            seed: Some(9),
            ..RunArgs::default()
        };
        let err = run(args).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(err.to_string().contains("1 of 1 runs aborted"), "{err}");
        assert!(err.to_string().contains("extrude-growth"));
    }

    #[test]
    fn unknown_preset_is_rejected() {
        assert!(resolve_presets(&["moss".into()]).is_err());
        assert_eq!(resolve_presets(&[]).unwrap(), Preset::ALL.to_vec());
    }
}
