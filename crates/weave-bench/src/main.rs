//! weave-bench CLI: run collision scenarios and export metrics.

use std::error::Error;

use clap::{Parser, Subcommand};
use weave_bench::{init_logging, load_config, BenchmarkMetrics, BenchmarkRunner, Scenario, ScenarioKind};
use weave_collision::CollisionConfig;
use weave_telemetry::{EventBus, TracingSink};

#[derive(Parser)]
#[command(name = "weave-bench")]
#[command(version, about = "Cloth collision benchmark scenarios")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run benchmark scenarios.
    Run {
        /// Which scenario to run (capsule_sweep, convex_box, triangle_floor, all).
        #[arg(short, long, default_value = "all")]
        scenario: String,

        /// Collision config (TOML) replacing each scenario's own.
        #[arg(short, long)]
        config: Option<String>,

        /// Override the number of frames.
        #[arg(short, long)]
        frames: Option<u32>,

        /// Output CSV file path.
        #[arg(short, long)]
        output: Option<String>,

        /// Forward per-substep events to the log.
        #[arg(long)]
        events: bool,
    },

    /// Print a config preset as TOML (default, continuous, high_quality).
    Preset {
        #[arg(default_value = "default")]
        name: String,
    },
}

fn run(
    scenario_name: &str,
    config_path: Option<&str>,
    frames: Option<u32>,
    output: Option<&str>,
    events: bool,
) -> Result<(), Box<dyn Error>> {
    let kinds: Vec<ScenarioKind> = if scenario_name == "all" {
        ScenarioKind::all().to_vec()
    } else {
        let kind = ScenarioKind::from_name(scenario_name)
            .ok_or_else(|| format!("unknown scenario '{scenario_name}'"))?;
        vec![kind]
    };
    let config = config_path.map(load_config).transpose()?;

    let mut bus = EventBus::new();
    bus.set_enabled(events);
    bus.add_sink(Box::new(TracingSink::new()));

    let mut all_metrics = Vec::new();
    for kind in kinds {
        let mut scenario = Scenario::from_kind(kind)?;
        if let Some(config) = config {
            scenario = scenario.with_config(config);
        }
        if let Some(frames) = frames {
            scenario.frames = frames;
        }

        println!(
            "Running: {} ({} particles, {} frames × {} substeps)",
            kind.name(),
            scenario.particle_count(),
            scenario.frames,
            scenario.substeps,
        );
        let metrics = BenchmarkRunner::run(&scenario, &bus)?;
        bus.flush();
        println!(
            "  {:.2} ms/frame, {} contacts, {} grid skips",
            metrics.avg_frame_time * 1000.0,
            metrics.total_contacts(),
            metrics.grid_skips,
        );
        all_metrics.push(metrics);
    }
    bus.finalize();

    println!();
    println!("{}", BenchmarkMetrics::to_csv(&all_metrics));
    if let Some(path) = output {
        BenchmarkMetrics::write_csv(path, &all_metrics)?;
        println!("Results written to: {path}");
    }
    Ok(())
}

fn preset(name: &str) -> Result<(), Box<dyn Error>> {
    let config = match name {
        "default" => CollisionConfig::default(),
        "continuous" => CollisionConfig::continuous(),
        "high_quality" => CollisionConfig::high_quality(),
        other => return Err(format!("unknown preset '{other}'").into()),
    };
    print!("{}", toml::to_string(&config)?);
    Ok(())
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            scenario,
            config,
            frames,
            output,
            events,
        } => run(&scenario, config.as_deref(), frames, output.as_deref(), events),
        Commands::Preset { name } => preset(&name),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
