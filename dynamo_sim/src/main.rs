//! Dynamo simulator CLI
//!
//! Runs engine scenarios under a virtual clock, or a free simulation from a
//! JSON config that prints every forwarded wire message.

use clap::Parser;
use dynamo_env::{ChannelSink, Clock, SystemClock};
use dynamo_sim::scenarios::ScenarioId;
use dynamo_sim::{ScenarioResult, ScenarioRunner, SimConfig, SimError, SimWorld};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Capacity of the channel between the world and the message printer.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Frames are captured every this many ticks when exporting.
const EXPORT_INTERVAL_TICKS: u64 = 10;

/// Dynamo deterministic simulation CLI
#[derive(Parser, Debug)]
#[command(name = "dynamo-sim")]
#[command(about = "Run deterministic simulations of the Dynamo engines", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (predator_prey, extinction, synchrony, incoherence, turing, quiescent, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Simulation duration in seconds
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Tick rate in Hz
    #[arg(short = 'r', long, default_value = "60")]
    tick_rate: u32,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export frames of a single scenario to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Run a free simulation from a JSON SimConfig instead of scenarios
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pace the free simulation at the configured tick rate
    #[arg(long)]
    realtime: bool,
}

/// Outcome of a free run.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FreeRunReport {
    ticks: u64,
    printed: u64,
    virtual_secs: f64,
    wall_secs: f64,
}

/// Runs the configured model and prints every forwarded message.
async fn run_free(config: SimConfig, realtime: bool) -> Result<FreeRunReport, SimError> {
    let total_ticks = (config.max_duration_secs > 0.0)
        .then(|| (config.max_duration_secs * f64::from(config.tick_rate_hz)) as u64);
    let tick_secs = config.tick_interval().as_secs_f64();
    let mut ticker = realtime.then(|| tokio::time::interval(config.tick_interval()));

    let (sink, mut rx) = ChannelSink::new(EVENT_CHANNEL_CAPACITY);
    let mut world = SimWorld::with_sink(config, Box::new(sink))?;

    let printer = tokio::spawn(async move {
        let mut printed = 0u64;
        while let Some(msg) = rx.recv().await {
            println!("{}", msg);
            printed += 1;
        }
        printed
    });

    let wall = SystemClock::new();
    world.start();
    let mut tick = 0u64;
    while total_ticks.map_or(true, |n| tick < n) {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        } else {
            // let the printer drain the channel
            tokio::task::yield_now().await;
        }
        world.tick();
        tick += 1;
    }
    world.stop();

    let wall_secs = wall.now_secs();
    info!(
        "Free run finished | model={} t={:.2}s wall={:.2}s emitted={} forwarded={} dropped={}",
        world.model(),
        world.now_secs(),
        wall_secs,
        world.events_emitted(),
        world.events_forwarded(),
        world.sink_errors()
    );

    let virtual_secs = world.now_secs();
    // wall time ahead of virtual time by more than one tick means ticks were late
    if realtime && wall_secs - virtual_secs > tick_secs {
        warn!(
            "Realtime run fell behind: virtual {:.2}s vs wall {:.2}s",
            virtual_secs, wall_secs
        );
    }

    // dropping the world closes the channel
    drop(world);
    Ok(FreeRunReport {
        ticks: tick,
        printed: printer.await.unwrap_or_default(),
        virtual_secs,
        wall_secs,
    })
}

fn free_run_main(path: &Path, realtime: bool) -> Result<(), SimError> {
    let config = SimConfig::load(path)?;
    info!("Free run from {} (model={}, seed={})", path.display(), config.model, config.seed);

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(run_free(config, realtime))?;
    info!("Printed {} messages over {} ticks", report.printed, report.ticks);
    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logging (RUST_LOG wins over --verbose)
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if let Some(path) = &args.config {
        if let Err(e) = free_run_main(path, args.realtime) {
            error!("Free run failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if !args.json {
        info!("Dynamo Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                eprintln!("Error: {}", e);
                let names: Vec<_> = ScenarioId::all().iter().map(|s| s.name()).collect();
                eprintln!("Available scenarios: {}, all", names.join(", "));
                std::process::exit(1);
            }
        }
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let runner = ScenarioRunner::new(base_seed)
            .with_tick_rate(args.tick_rate)
            .with_duration(args.duration);
        let (result, export) = runner.run_with_export(scenarios[0], EXPORT_INTERVAL_TICKS);

        match export.write_to_file(export_path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), export_path.display()),
            Err(e) => {
                error!("Failed to write export: {}", e);
                std::process::exit(1);
            }
        }

        if result.passed {
            info!("✓ {} (seed={}) PASSED", scenarios[0].name(), base_seed);
        } else {
            error!(
                "✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed)
            .with_tick_rate(args.tick_rate)
            .with_duration(args.duration);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "time_secs": r.final_time_secs,
                    "failure_reason": r.failure_reason,
                    "metrics": r.metrics,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
