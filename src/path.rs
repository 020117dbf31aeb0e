// sweep file layout:
// {simulator}                      external L1simulate binary
// {trace_prefix}_proc{core}.trace  one trace per core, core in 0..4
// {output}                         csv with one row per successful trial
// {plot_dir}/
//    |- exp{n}_{sweep}.png         one chart per sweep
//    \- comparison_{axis}.png      multi-sweep comparisons

use anyhow::bail;
use resolve_path::PathResolveExt;
use std::path::{Path, PathBuf};

/// Number of cores the simulator models, one trace file each
pub const NUM_CORES: usize = 4;

pub fn get_trace_path<P: AsRef<Path>>(trace_prefix: P, core: usize) -> PathBuf {
    let mut path = trace_prefix.as_ref().as_os_str().to_os_string();
    path.push(format!("_proc{core}.trace"));
    PathBuf::from(path)
}

pub fn get_trace_paths<P: AsRef<Path>>(trace_prefix: P) -> Vec<PathBuf> {
    (0..NUM_CORES)
        .map(|core| get_trace_path(&trace_prefix, core))
        .collect()
}

pub fn get_chart_path<P: AsRef<Path>>(plot_dir: P, file_name: &str) -> PathBuf {
    plot_dir.as_ref().join(file_name)
}

/// Expand a leading `~` to the home directory
pub fn expand_home<P: AsRef<Path>>(path: P) -> anyhow::Result<PathBuf> {
    let path = path.as_ref();
    if path.starts_with("~") {
        Ok(path.try_resolve()?.into_owned())
    } else {
        Ok(path.to_path_buf())
    }
}

/// Check the simulator and every per-core trace exist before any trial runs
pub fn preflight<P1: AsRef<Path>, P2: AsRef<Path>>(
    simulator: P1,
    trace_prefix: P2,
) -> anyhow::Result<()> {
    let simulator = simulator.as_ref();
    if !simulator.is_file() {
        bail!("simulator not found: {}", simulator.display());
    }

    for trace_path in get_trace_paths(trace_prefix) {
        if !trace_path.is_file() {
            bail!("trace file missing: {}", trace_path.display());
        }
    }
    Ok(())
}
