//! Sweep cache geometries through the external L1 simulator
use cache_sweep::{
    DEFAULT_TIMEOUT, SweepConfig, SweepPlan, display_path, plotting_available, print_summary,
    run_sweeps,
};
use chrono::Local;
use clap::Parser;
use log::warn;
use std::{path::PathBuf, time::Duration};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the simulator executable
    #[arg(short, long, default_value = "./L1simulate")]
    simulator: PathBuf,

    /// Trace prefix, traces are read from {trace}_proc{0..3}.trace
    #[arg(short, long, default_value = "traces/app1")]
    trace: PathBuf,

    /// Path to result csv
    #[arg(short, long, default_value = "experiment_results.csv")]
    output: PathBuf,

    /// Directory for generated charts
    #[arg(short, long, default_value = "plots")]
    plot_dir: PathBuf,

    /// Per trial timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Sweep plan json, defaults to the built-in six sweeps
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Skip chart rendering even if matplotlib is available
    #[arg(long)]
    no_plots: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Cli::parse();

    println!("{}", "=".repeat(50));
    println!("  CACHE PERFORMANCE ANALYSIS");
    println!("{}", "=".repeat(50));
    println!("Started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    // decided once, every chart call honors it
    let plotting = !args.no_plots && plotting_available();
    if !args.no_plots && !plotting {
        warn!("python3 with matplotlib not found, csv output only");
    }

    let plan = match &args.plan {
        Some(path) => {
            println!("Loading sweep plan from {}", path.display());
            SweepPlan::load(path)?
        }
        None => SweepPlan::default(),
    };

    let config = SweepConfig {
        simulator: args.simulator,
        trace_prefix: args.trace,
        output: args.output,
        plot_dir: args.plot_dir,
        timeout: Duration::from_secs(args.timeout),
        plotting,
    }
    .resolve()?;

    let results = run_sweeps(&config, &plan)?;

    if !results.is_empty() {
        println!("Results:");
        print_summary(&mut std::io::stdout(), results.results());
        println!(
            "Results exported to {}",
            display_path(&config.output).display()
        );
    }

    println!("{}", "=".repeat(50));
    println!(
        "  ANALYSIS COMPLETE at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("{}", "=".repeat(50));
    Ok(())
}
