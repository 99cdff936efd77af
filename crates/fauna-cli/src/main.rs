//! `fauna` – command line front end for the world-model stack.
//!
//! | Command | Effect |
//! |---|---|
//! | `fauna run` | Run the built-in headless scenario and print a summary (or JSON frames). |
//! | `fauna init-config` | Write a default `~/.fauna/config.toml`. |
//! | `fauna show-config` | Print the effective configuration (file + `FAUNA_*` overrides). |
//! | `fauna schema` | Print the JSON schema of observation frames. |
//!
//! Ctrl-C during `run` stops the loop after the current tick and still
//! prints the summary.

mod config;
mod scenario;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use colored::Colorize;
use fauna_runtime::{AgentLoop, MapRecorder, ObservationFrame, init_tracing};
use fauna_types::Category;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fauna")]
#[command(about = "Perceptual world-model memory for simulated agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in scenario
    Run {
        /// Number of simulation ticks
        #[arg(short, long, default_value_t = 600)]
        ticks: u32,

        /// Seconds of simulation time per tick
        #[arg(short, long, default_value_t = 0.1)]
        dt: f32,

        /// Print one JSON observation frame per scan instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration as TOML
    ShowConfig,

    /// Print the JSON schema of observation frames
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { ticks, dt, json } => run(ticks, dt, json),
        Commands::InitConfig { force } => init_config(force),
        Commands::ShowConfig => show_config(),
        Commands::Schema => ObservationFrame::json_schema()
            .map(|schema| println!("{schema}"))
            .map_err(|e| e.to_string()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// run
// ─────────────────────────────────────────────────────────────────────────────

fn run(ticks: u32, dt: f32, json: bool) -> Result<(), String> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(format!("--dt must be positive, got {dt}"));
    }
    let cfg = config::load_or_default()?;
    let _guard = init_tracing(&cfg.telemetry);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || stop_handler.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run can only end by tick count");
    }

    let recorder = MapRecorder::new();
    let mut agent = AgentLoop::new(cfg.agent, Box::new(scenario::sensor()))
        .map_err(|e| e.to_string())?
        .with_aggregator(Box::new(recorder.clone()));
    info!(agent_id = %agent.agent_id(), ticks, dt, "scenario started");

    let mut scans = 0usize;
    let mut attacked = false;
    for _ in 0..ticks {
        if stop.load(Ordering::SeqCst) {
            warn!(now = agent.now(), "interrupted");
            break;
        }
        agent.set_pose(scenario::pose_at(agent.now()));
        let report = agent.step(dt);

        if !attacked && report.now >= scenario::ATTACK_AT {
            attacked = true;
            let at = scenario::critter_at(report.now);
            let affected = agent.world_mut().register_danger_event(&at, true, Some(report.now));
            info!(affected, x = at.x, z = at.z, "critter attacked");
        }

        if report.scan.is_some() {
            scans += 1;
            if json {
                let frame = agent.world_mut().frame();
                println!("{}", frame.to_json().map_err(|e| e.to_string())?);
            }
        }
    }

    if !json {
        print_summary(&mut agent, scans, recorder.len());
    }
    Ok(())
}

fn print_summary(agent: &mut AgentLoop, scans: usize, batches: usize) {
    let now = agent.now();
    let world = agent.world_mut();
    let live = world.index().live_len();
    let tombstoned = world.index().tombstoned_len();
    let short = world.short_horizon().len();
    let table_rows = world.observation_table().len();

    println!();
    println!("  {} after {:.1}s", "Fauna world model".bold().cyan(), now);
    println!("    scans            {}", scans);
    println!("    map batches      {}", batches);
    println!("    live entries     {}", live.to_string().bold());
    println!("    tombstoned       {}", tombstoned);
    println!("    short-horizon    {}", short);
    println!("    table rows       {}", table_rows);
    println!();

    for entry in world.index().live_entries() {
        let category = match entry.category {
            Category::Food => entry.category.to_string().green(),
            Category::Threat => entry.category.to_string().red(),
            Category::Obstacle => entry.category.to_string().yellow(),
            Category::Unknown => entry.category.to_string().dimmed(),
        };
        println!(
            "    #{:<3} {:<9} ({:>6.2}, {:>6.2})  conf {:.2}  attacks {}",
            entry.id, category, entry.position.x, entry.position.z, entry.confidence, entry.stats.attack_count
        );
    }

    let food = world.closest_summary(Category::Food);
    println!();
    if food[0] > 0.0 {
        println!("    closest food     {:.2} away, bearing {:+.2}π", food[1], food[2]);
    } else {
        println!("    closest food     {}", "none remembered".dimmed());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// config commands
// ─────────────────────────────────────────────────────────────────────────────

fn init_config(force: bool) -> Result<(), String> {
    let path = config::config_path();
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()));
    }
    let path = config::save(&config::Config::default())?;
    println!("  {} Config saved to {}", "✓".green().bold(), path.display().to_string().bold());
    Ok(())
}

fn show_config() -> Result<(), String> {
    let cfg = config::load_or_default()?;
    let path = config::config_path();
    let source = if path.exists() {
        path.display().to_string()
    } else {
        "defaults".to_string()
    };
    println!("# effective configuration ({source})");
    print!("{}", config::to_toml(&cfg)?);
    Ok(())
}
