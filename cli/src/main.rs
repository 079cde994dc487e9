//! `slottrack` CLI: scenario runs, replays, seed sweeps.

use anyhow::{Context, Result};
use camera_models::FrameDriver;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde_json::json;
use sim::replay::{load_replay, save_replay, ReplayLog};
use sim::scenarios::{Scenario, ScenarioKind};
use std::path::{Path, PathBuf};
use tracing::info;
use tracker_core::config::load_config;
use tracker_core::metrics::{GroundTruth, TrackingMetrics};
use tracker_core::pipeline::{Pipeline, PipelineConfig, PipelineOutput};
use tracker_core::slot_controller::FrameEvents;

#[derive(Parser)]
#[command(name = "slottrack", about = "Three-slot target tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named scenario through the simulated camera and output metrics.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Pipeline config JSON (defaults when absent)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the detector output and ground truth as a replay log
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Load and replay a previously recorded scenario log.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        /// Pipeline config JSON (defaults when absent)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run seeds 0..N of a scenario in parallel and report mean metrics.
    Sweep {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Number of seeds
        #[arg(long, default_value_t = 16)]
        seeds: u64,
        /// Pipeline config JSON (defaults when absent)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            config,
            output,
            save_replay: save_path,
        } => {
            let config = pipeline_config(config.as_deref())?;
            run_scenario(scenario, seed, config, output.as_deref(), save_path.as_deref())?;
        }
        Commands::Replay {
            input,
            config,
            output,
        } => {
            let config = pipeline_config(config.as_deref())?;
            run_replay(&input, config, output.as_deref())?;
        }
        Commands::Sweep {
            scenario,
            seeds,
            config,
        } => {
            let config = pipeline_config(config.as_deref())?;
            run_sweep(scenario, seeds, config)?;
        }
    }

    Ok(())
}

fn pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            load_config(path).with_context(|| format!("loading config {}", path.display()))
        }
        None => Ok(PipelineConfig::default()),
    }
}

/// Everything measured over one run.
#[derive(Default)]
struct RunSummary {
    frames: u64,
    events: FrameEvents,
    metrics: TrackingMetrics,
    elapsed_s: f64,
}

impl RunSummary {
    fn observe(&mut self, output: &PipelineOutput, truth: &[GroundTruth]) {
        self.frames += 1;
        self.events += output.events;
        self.metrics.accumulate(&output.snapshot, truth);
    }

    fn to_json(&self, name: &str, seed: u64) -> serde_json::Value {
        json!({
            "scenario": name,
            "seed": seed,
            "frames": self.frames,
            "elapsed_s": self.elapsed_s,
            "events": self.events,
            "metrics": {
                "precision": self.metrics.precision(),
                "recall": self.metrics.recall(),
                "rmse_center_px": self.metrics.rmse_center(),
                "identity_switches": self.metrics.identity_switches,
                "head_changes": self.metrics.head_changes,
                "true_positives": self.metrics.true_positives,
                "false_positives": self.metrics.false_positives,
                "false_negatives": self.metrics.false_negatives,
            }
        })
    }

    fn print(&self, name: &str) {
        println!(
            "Done '{}': {} frames in {:.2}s, {} creations, {} promotions, {} arbitration swaps",
            name,
            self.frames,
            self.elapsed_s,
            self.events.creations,
            self.events.promotions,
            self.events.arbitration_swaps,
        );
        println!(
            "Precision {:.3}  Recall {:.3}  RMSE {:.1} px  ID switches {}  HEAD changes {}",
            self.metrics.precision(),
            self.metrics.recall(),
            self.metrics.rmse_center(),
            self.metrics.identity_switches,
            self.metrics.head_changes,
        );
    }
}

/// Run one scenario through the frame driver. Records a replay log when asked.
fn simulate(
    kind: ScenarioKind,
    seed: u64,
    config: PipelineConfig,
    record: bool,
) -> Result<(Scenario, RunSummary, Option<ReplayLog>)> {
    let scenario = Scenario::build(kind, seed);
    let mut pipeline = Pipeline::new(config, 0.0);
    let mut driver = FrameDriver::new(scenario.camera(), scenario.detector());
    let mut summary = RunSummary::default();
    let mut log = record.then(|| ReplayLog::new(&scenario));

    let start = std::time::Instant::now();
    driver.run(&mut pipeline, None, |frame, detections, output| {
        let truth: Vec<GroundTruth> = frame.truth.iter().map(|t| t.ground_truth()).collect();
        summary.observe(output, &truth);
        if let Some(log) = log.as_mut() {
            log.push(frame, detections.clone());
        }
    })?;
    summary.elapsed_s = start.elapsed().as_secs_f64();

    Ok((scenario, summary, log))
}

fn run_scenario(
    kind: ScenarioKind,
    seed: u64,
    config: PipelineConfig,
    output_path: Option<&Path>,
    replay_path: Option<&Path>,
) -> Result<()> {
    println!("Running scenario '{:?}' (seed={})...", kind, seed);
    let (scenario, summary, log) = simulate(kind, seed, config, replay_path.is_some())?;
    summary.print(&scenario.name);

    if let (Some(rpath), Some(log)) = (replay_path, log) {
        save_replay(&log, rpath)?;
        println!("Replay saved to {}", rpath.display());
    }

    if let Some(opath) = output_path {
        let metrics = summary.to_json(&scenario.name, seed);
        std::fs::write(opath, serde_json::to_string_pretty(&metrics)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    Ok(())
}

fn run_replay(input: &Path, config: PipelineConfig, output_path: Option<&Path>) -> Result<()> {
    let log = load_replay(input).with_context(|| format!("loading replay {}", input.display()))?;
    println!(
        "Loaded replay '{}': {} frames at {:.0} fps",
        log.scenario_name,
        log.frames.len(),
        log.fps
    );

    let start_time = log.frames.first().map_or(0.0, |f| f.timestamp);
    let mut pipeline = Pipeline::new(config, start_time);
    let mut summary = RunSummary::default();
    let start = std::time::Instant::now();
    for (frame, truth) in log.frames.iter().zip(&log.ground_truth) {
        let output = pipeline.process_frame(frame);
        summary.observe(&output, &truth.ground_truth());
    }
    summary.elapsed_s = start.elapsed().as_secs_f64();
    summary.print(&log.scenario_name);

    if let Some(opath) = output_path {
        let metrics = summary.to_json(&log.scenario_name, log.seed);
        std::fs::write(opath, serde_json::to_string_pretty(&metrics)?)?;
        println!("Metrics saved to {}", opath.display());
    }
    Ok(())
}

fn run_sweep(kind: ScenarioKind, seeds: u64, config: PipelineConfig) -> Result<()> {
    anyhow::ensure!(seeds > 0, "--seeds must be at least 1");
    info!(?kind, seeds, "starting sweep");

    let runs = (0..seeds)
        .into_par_iter()
        .map(|seed| simulate(kind, seed, config, false).map(|(_, summary, _)| summary))
        .collect::<Result<Vec<_>>>()?;

    let precision = mean(&runs, |r| r.metrics.precision());
    let recall = mean(&runs, |r| r.metrics.recall());
    let rmse = mean(&runs, |r| r.metrics.rmse_center());
    let switches = mean(&runs, |r| r.metrics.identity_switches as f64);
    let head_changes = mean(&runs, |r| r.metrics.head_changes as f64);

    println!(
        "Sweep '{:?}' over {} seeds: precision {:.3}, recall {:.3}, RMSE {:.1} px, \
         ID switches {:.2}, HEAD changes {:.2}",
        kind, seeds, precision, recall, rmse, switches, head_changes
    );
    let summary = json!({
        "scenario": format!("{kind:?}"),
        "seeds": seeds,
        "mean_precision": precision,
        "mean_recall": recall,
        "mean_rmse_center_px": rmse,
        "mean_identity_switches": switches,
        "mean_head_changes": head_changes,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn mean(runs: &[RunSummary], f: impl Fn(&RunSummary) -> f64) -> f64 {
    runs.iter().map(f).sum::<f64>() / runs.len() as f64
}
