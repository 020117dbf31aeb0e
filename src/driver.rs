use crate::{
    ChartRenderer, ResultSet, SweepPlan, TrialResult, TrialRunner, display_path, expand_home,
    get_tqdm_style, preflight,
};
use cli_table::{Cell, Table, TableStruct};
use log::{info, warn};
use std::{io::Write, path::PathBuf, time::Duration};

/// Settings of one sweep run, resolved once at startup
#[derive(Clone, Debug)]
pub struct SweepConfig {
    /// Path to the L1simulate executable
    pub simulator: PathBuf,
    /// Trace prefix, `{prefix}_proc{core}.trace` per core
    pub trace_prefix: PathBuf,
    /// Csv file written after all sweeps
    pub output: PathBuf,
    /// Directory receiving the charts
    pub plot_dir: PathBuf,
    /// Wall clock limit of one trial
    pub timeout: Duration,
    /// Whether charts can be rendered at all
    pub plotting: bool,
}

impl SweepConfig {
    /// Expand `~` in the input paths
    pub fn resolve(mut self) -> anyhow::Result<Self> {
        self.simulator = expand_home(&self.simulator)?;
        self.trace_prefix = expand_home(&self.trace_prefix)?;
        Ok(self)
    }

    pub fn runner(&self) -> TrialRunner {
        TrialRunner::new(&self.simulator, &self.trace_prefix, self.timeout)
    }
}

/// Run every trial of the plan in order, appending successes to `results`
pub fn run_plan(
    plan: &SweepPlan,
    runner: &TrialRunner,
    results: &mut ResultSet,
    pbar: &indicatif::ProgressBar,
) {
    for (index, sweep) in plan.sweeps.iter().enumerate() {
        pbar.println(format!("[Experiment {}] {}...", index + 1, sweep.description));
        pbar.set_message(sweep.label.clone());
        for params in sweep.params() {
            pbar.println(format!(
                "  [{}] {} -> {} bytes ({})",
                params.label,
                params.geometry,
                params.cache_size(),
                size::Size::from_bytes(params.cache_size())
            ));
            results.add(runner.run(&params));
            pbar.inc(1);
        }
    }
}

/// Draw every chart of the plan, returns how many files were written
pub fn render_charts(
    plan: &SweepPlan,
    records: &[TrialResult],
    renderer: &ChartRenderer,
) -> usize {
    if !renderer.enabled() {
        return 0;
    }

    println!(
        "Generating charts in {}",
        display_path(renderer.out_dir()).display()
    );
    let mut written = 0;
    for chart in &plan.charts {
        match renderer.render(records, chart) {
            Ok(Some(path)) => {
                println!("  Saved: {}", display_path(path).display());
                written += 1;
            }
            Ok(None) => {}
            Err(err) => warn!("Failed to render {}: {:#}", chart.file, err),
        }
    }
    written
}

/// Full experiment: pre-flight, all sweeps, csv export, charts
///
/// Only pre-flight and plan problems are errors; failed trials, export and
/// chart failures are logged.
pub fn run_sweeps(config: &SweepConfig, plan: &SweepPlan) -> anyhow::Result<ResultSet> {
    preflight(&config.simulator, &config.trace_prefix)?;
    plan.validate()?;

    let runner = config.runner();
    info!(
        "Running {} trials with {} (timeout {}s)",
        plan.num_trials(),
        runner.simulator().display(),
        runner.timeout().as_secs()
    );

    let mut results = ResultSet::new();
    let pbar = indicatif::ProgressBar::new(plan.num_trials() as u64);
    pbar.set_style(get_tqdm_style());
    run_plan(plan, &runner, &mut results, &pbar);
    pbar.finish();
    info!("{} of {} trials succeeded", results.len(), plan.num_trials());

    results.export_csv(&config.output);

    match ChartRenderer::new(&config.plot_dir, config.plotting) {
        Ok(renderer) => {
            render_charts(plan, results.results(), &renderer);
        }
        Err(err) => warn!(
            "Cannot create plot directory {}: {:#}",
            config.plot_dir.display(),
            err
        ),
    }

    Ok(results)
}

/// One row per result, for printing at the end of a run
pub fn summary_table(records: &[TrialResult]) -> TableStruct {
    let rows: Vec<_> = records
        .iter()
        .map(|record| {
            vec![
                record.experiment.clone().cell(),
                record.s.cell(),
                record.e.cell(),
                record.b.cell(),
                format!("{}", size::Size::from_bytes(record.cache_size)).cell(),
                record.exec_cycles.cell(),
            ]
        })
        .collect();
    rows.table().title(vec![
        "Experiment".cell(),
        "s".cell(),
        "E".cell(),
        "b".cell(),
        "Cache size".cell(),
        "Exec. cycles".cell(),
    ])
}

/// Print the summary table, a closed or full output is only logged
pub fn print_summary<W: Write>(out: &mut W, records: &[TrialResult]) {
    let printed = summary_table(records)
        .display()
        .and_then(|table| writeln!(out, "{}", table));
    if let Err(err) = printed {
        warn!("Failed to print results: {}", err);
    }
}
