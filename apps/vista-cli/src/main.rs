mod config;
mod run;
mod scene;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use vista_common::EntityId;
use vista_kernel::World;
use vista_render::{CullStats, DebugTextRenderer, DrawItem, FrameSnapshot, Renderer, cull, draw_list};

use crate::config::SceneConfig;
use crate::scene::Scene;

#[derive(Parser)]
#[command(name = "vista-cli", about = "Frame sync and visibility demos")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene config (YAML). Missing file means defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run the simulation and render threads over the triple buffer
    Run {
        /// Number of ticks to simulate
        #[arg(short, long)]
        ticks: Option<u64>,
        /// Frames the simulated GPU fence stays busy per submit
        #[arg(short, long)]
        latency: Option<u32>,
        /// Print every rendered frame
        #[arg(long)]
        frames: bool,
    },
    /// Cull a single snapshot of the demo scene and report the result
    Cull {
        /// Grid entities per side
        #[arg(short, long)]
        grid: Option<usize>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct CullReport {
    tick: u64,
    entities: usize,
    stats: CullStats,
    visible: Vec<EntityId>,
    draws: Vec<DrawItem>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => SceneConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("vista-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel: tick={}", World::new().tick());
            println!("render: {}", vista_render::crate_info());
            println!("sync: {}", vista_sync::crate_info());
            println!(
                "camera: fov={} near={} far={} perspective={}",
                config.camera.fov, config.camera.near, config.camera.far, config.camera.perspective
            );
        }
        Commands::Run { ticks, latency, frames } => {
            if let Some(ticks) = ticks {
                config.ticks = ticks;
            }
            if let Some(latency) = latency {
                config.gpu_latency_frames = latency;
            }
            println!(
                "Run: grid={}x{}, ticks={}, gpu latency={} frames",
                config.grid_size, config.grid_size, config.ticks, config.gpu_latency_frames
            );

            let report = run::run(&config, frames)?;

            println!("Sync: {}", report.stats);
            println!(
                "Frames: rendered={} loop iterations={} last tick={}",
                report.frames_rendered, report.loop_iterations, report.last_tick
            );
            println!(
                "Frame time: avg={:?} p95={:?} max={:?}",
                report.timer.average(),
                report.timer.percentile(95.0),
                report.timer.max()
            );
            println!(
                "Last frame: visible={} draws={}; uploaded {} bytes, {} unresolved materials",
                report.last_visible, report.last_draws, report.upload_bytes, report.unresolved_materials
            );
        }
        Commands::Cull { grid, json } => {
            if let Some(grid) = grid {
                config.grid_size = grid;
            }
            let scene = Scene::new(&config).context("building demo scene")?;
            let snapshot = FrameSnapshot::capture(&scene.world, &scene.camera);
            let visibility = cull(&snapshot);

            if json {
                let report = CullReport {
                    tick: snapshot.tick,
                    entities: snapshot.entity_count(),
                    stats: visibility.stats,
                    visible: visibility.visible_ids(&snapshot).collect(),
                    draws: draw_list(&snapshot, &visibility),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let renderer = DebugTextRenderer { verbose: cli.verbose };
                print!("{}", renderer.render(&snapshot, &visibility));
            }
        }
    }

    Ok(())
}
