//! Render sweep charts from a previously exported csv
use cache_sweep::{ChartRenderer, ResultSet, SweepPlan, plotting_available, render_charts};
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to result csv
    #[arg(short, long, default_value = "experiment_results.csv")]
    input: PathBuf,

    /// Directory for generated charts
    #[arg(short, long, default_value = "plots")]
    plot_dir: PathBuf,

    /// Sweep plan json providing the chart definitions
    #[arg(long)]
    plan: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Cli::parse();

    if !plotting_available() {
        anyhow::bail!("python3 with matplotlib is required to render charts");
    }

    let plan = match &args.plan {
        Some(path) => SweepPlan::load(path)?,
        None => SweepPlan::default(),
    };

    let results = ResultSet::load_csv(&args.input)?;
    info!(
        "Loaded {} results of {} sweeps from {}",
        results.len(),
        results.labels().len(),
        args.input.display()
    );

    let renderer = ChartRenderer::new(&args.plot_dir, true)?;
    let written = render_charts(&plan, results.results(), &renderer);
    println!("{} of {} charts written", written, plan.charts.len());
    Ok(())
}
