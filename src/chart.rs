use crate::{TrialResult, get_chart_path};
use anyhow::{Context, bail};
use log::warn;
use matplotlib::{Matplotlib, MatplotlibOpts, Mpl, Run, commands as c, serde_json::Value};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Markers of comparison series, picked by series position
pub const MARKERS: [&str; 8] = ["o", "s", "^", "D", "v", "<", ">", "p"];
/// Colors of comparison series, picked by series position
pub const COLORS: [&str; 5] = ["#2196F3", "#4CAF50", "#FF5722", "#9C27B0", "#FFC107"];

/// A numeric column of the result table
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    #[serde(rename = "s")]
    S,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "b")]
    B,
    #[serde(rename = "cache_size")]
    CacheSize,
    #[serde(rename = "exec_cycles")]
    ExecCycles,
}

impl Field {
    pub fn value(&self, result: &TrialResult) -> f64 {
        match self {
            Field::S => result.s as f64,
            Field::E => result.e as f64,
            Field::B => result.b as f64,
            Field::CacheSize => result.cache_size as f64,
            Field::ExecCycles => result.exec_cycles as f64,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartKind {
    /// One line, optionally restricted to one sweep label
    Single {
        #[serde(default)]
        label: Option<String>,
    },
    /// One line per sweep label, with a legend
    Comparison { labels: Vec<String> },
}

/// A chart file to draw from the results
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChartSpec {
    /// File name inside the plot directory
    pub file: String,
    pub title: String,
    pub x: Field,
    pub y: Field,
    pub x_label: String,
    pub y_label: String,
    #[serde(flatten)]
    pub kind: ChartKind,
}

/// Points of one line, in insertion order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    pub label: Option<String>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl Series {
    /// Collect the records matching `label` (all records when `None`)
    pub fn select(records: &[TrialResult], label: Option<&str>, x: Field, y: Field) -> Self {
        let mut series = Series {
            label: label.map(|label| label.to_string()),
            ..Default::default()
        };
        for record in records
            .iter()
            .filter(|record| label.is_none_or(|label| record.experiment == label))
        {
            series.xs.push(x.value(record));
            series.ys.push(y.value(record));
        }
        series
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// Marker and color of the series at `position`
pub fn series_style(position: usize) -> (&'static str, &'static str) {
    (
        MARKERS[position % MARKERS.len()],
        COLORS[position % COLORS.len()],
    )
}

/// Series of a comparison chart with their positions; labels without
/// records are left out but keep their position
///
/// A comparison, like a single series chart, with no points at all writes
/// no file, so a run with missing sweeps leaves fewer charts than the plan
/// lists.
pub fn comparison_series(
    records: &[TrialResult],
    labels: &[String],
    x: Field,
    y: Field,
) -> Vec<(usize, Series)> {
    labels
        .iter()
        .enumerate()
        .map(|(position, label)| (position, Series::select(records, Some(label.as_str()), x, y)))
        .filter(|(_, series)| !series.is_empty())
        .collect()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct ChartPrelude;

impl Matplotlib for ChartPrelude {
    fn is_prelude(&self) -> bool {
        true
    }

    fn data(&self) -> Option<Value> {
        None
    }

    fn py_cmd(&self) -> String {
        "\
import matplotlib
matplotlib.use(\"Agg\")
import matplotlib.pyplot as plt
import numpy as np
"
        .into()
    }
}

/// Title, axis labels, grid and optional legend of the current figure
#[derive(Clone, Debug, PartialEq, Eq)]
struct Decorations {
    title: String,
    x_label: String,
    y_label: String,
    legend: bool,
    width: u32,
}

/// Quote a string as a python literal
fn py_str(s: &str) -> String {
    // a json string is a valid python string literal
    Value::String(s.to_string()).to_string()
}

impl Matplotlib for Decorations {
    fn is_prelude(&self) -> bool {
        false
    }

    fn data(&self) -> Option<Value> {
        None
    }

    fn py_cmd(&self) -> String {
        let mut cmd = format!(
            "\
plt.gcf().set_size_inches({}, 6)
plt.gcf().set_dpi(120)
plt.xlabel({}, fontsize=11)
plt.ylabel({}, fontsize=11)
plt.title({}, fontsize=12, fontweight=\"bold\")
plt.grid(True, alpha=0.4)
",
            self.width,
            py_str(&self.x_label),
            py_str(&self.y_label),
            py_str(&self.title),
        );
        if self.legend {
            cmd.push_str("plt.legend(loc=\"best\", fontsize=9)\n");
        }
        cmd
    }
}

/// Draws line charts into a directory, or nothing when plotting is disabled
#[derive(Clone, Debug)]
pub struct ChartRenderer {
    out_dir: PathBuf,
    enabled: bool,
}

impl ChartRenderer {
    pub fn new<P: AsRef<Path>>(out_dir: P, enabled: bool) -> anyhow::Result<Self> {
        if enabled {
            std::fs::create_dir_all(&out_dir)?;
        }
        Ok(Self {
            out_dir: out_dir.as_ref().to_path_buf(),
            enabled,
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Draw one chart of the plan, returns the written file if any
    pub fn render(
        &self,
        records: &[TrialResult],
        chart: &ChartSpec,
    ) -> anyhow::Result<Option<PathBuf>> {
        let axis_labels = (chart.x_label.as_str(), chart.y_label.as_str());
        match &chart.kind {
            ChartKind::Single { label } => self.single_series(
                records,
                chart.x,
                chart.y,
                &chart.title,
                axis_labels,
                &chart.file,
                label.as_deref(),
            ),
            ChartKind::Comparison { labels } => self.multi_series(
                records,
                labels,
                chart.x,
                chart.y,
                &chart.title,
                axis_labels,
                &chart.file,
            ),
        }
    }

    /// Skipped with a warning, writing no file, when no record matches
    #[allow(clippy::too_many_arguments)]
    pub fn single_series(
        &self,
        records: &[TrialResult],
        x: Field,
        y: Field,
        title: &str,
        (x_label, y_label): (&str, &str),
        file: &str,
        label: Option<&str>,
    ) -> anyhow::Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }

        let series = Series::select(records, label, x, y);
        if series.is_empty() {
            warn!("No data points for {}, skipping", file);
            return Ok(None);
        }

        let mpl = single_series_plot(series, title, (x_label, y_label));
        save(mpl, get_chart_path(&self.out_dir, file))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn multi_series(
        &self,
        records: &[TrialResult],
        labels: &[String],
        x: Field,
        y: Field,
        title: &str,
        (x_label, y_label): (&str, &str),
        file: &str,
    ) -> anyhow::Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }

        let all_series = comparison_series(records, labels, x, y);
        if all_series.is_empty() {
            warn!("No data points for {}, skipping", file);
            return Ok(None);
        }

        let mpl = multi_series_plot(all_series, title, (x_label, y_label));
        save(mpl, get_chart_path(&self.out_dir, file))
    }
}

fn single_series_plot(series: Series, title: &str, (x_label, y_label): (&str, &str)) -> Mpl {
    Mpl::new()
        & ChartPrelude
        & c::DefInit
        & c::plot(series.xs, series.ys)
            .o("color", "b")
            .o("marker", "o")
            .o("linestyle", "-")
        & Decorations {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            legend: false,
            width: 9,
        }
}

fn multi_series_plot(
    all_series: Vec<(usize, Series)>,
    title: &str,
    (x_label, y_label): (&str, &str),
) -> Mpl {
    let mut mpl = Mpl::new() & ChartPrelude & c::DefInit;
    for (position, series) in all_series {
        let (marker, color) = series_style(position);
        let label = series.label.unwrap_or_default();
        mpl = mpl
            & c::plot(series.xs, series.ys)
                .o("marker", marker)
                .o("color", color)
                .o("label", label.as_str());
    }
    mpl & Decorations {
        title: title.to_string(),
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        legend: true,
        width: 10,
    }
}

/// Run the script and check the image landed at `path`
fn save(mpl: Mpl, path: PathBuf) -> anyhow::Result<Option<PathBuf>> {
    mpl.run(Run::Save(path.clone()))
        .with_context(|| format!("matplotlib failed on {}", path.display()))?;
    if !path.is_file() {
        bail!("matplotlib did not write {}", path.display());
    }
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::{
        COLORS, MARKERS, comparison_series, multi_series_plot, py_str, series_style,
        single_series_plot,
    };
    use crate::{
        CacheGeometry, ChartKind, ChartRenderer, ChartSpec, Field, Series, SweepPlan, TrialParams,
        TrialResult,
    };
    use matplotlib::Run;

    fn sample(label: &str, s: u32, e: u32, b: u32, cycles: u64) -> TrialResult {
        TrialResult::new(
            &TrialParams::new(label, CacheGeometry::new(s, e, b)),
            cycles,
        )
    }

    fn records() -> Vec<TrialResult> {
        vec![
            sample("vary_s", 3, 4, 4, 300),
            sample("vary_E", 5, 2, 4, 250),
            sample("vary_s", 2, 4, 4, 400),
            sample("vary_s", 4, 4, 4, 200),
            sample("vary_E", 5, 8, 4, 150),
        ]
    }

    #[test]
    fn test_field_values() {
        let record = sample("vary_b", 5, 4, 6, 12345);
        assert_eq!(Field::S.value(&record), 5.0);
        assert_eq!(Field::E.value(&record), 4.0);
        assert_eq!(Field::B.value(&record), 6.0);
        assert_eq!(Field::CacheSize.value(&record), 8192.0);
        assert_eq!(Field::ExecCycles.value(&record), 12345.0);
    }

    #[test]
    fn test_series_keeps_insertion_order() {
        let series = Series::select(&records(), Some("vary_s"), Field::S, Field::ExecCycles);
        assert_eq!(series.label.as_deref(), Some("vary_s"));
        assert_eq!(series.xs, vec![3.0, 2.0, 4.0]);
        assert_eq!(series.ys, vec![300.0, 400.0, 200.0]);

        let all = Series::select(&records(), None, Field::E, Field::ExecCycles);
        assert_eq!(all.xs.len(), 5);
        assert_eq!(all.label, None);

        let missing = Series::select(&records(), Some("vary_b"), Field::B, Field::ExecCycles);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_comparison_skips_empty_labels() {
        let labels = vec![
            "vary_s".to_string(),
            "vary_b".to_string(),
            "vary_E".to_string(),
        ];
        let series = comparison_series(&records(), &labels, Field::CacheSize, Field::ExecCycles);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].0, 0);
        assert_eq!(series[0].1.label.as_deref(), Some("vary_s"));
        // vary_E keeps its style slot even though vary_b drew nothing
        assert_eq!(series[1].0, 2);
        assert_eq!(series[1].1.xs, vec![1024.0, 4096.0]);
    }

    fn plot_lines(code: &str) -> Vec<&str> {
        code.lines()
            .filter(|line| line.starts_with("ax.plot("))
            .collect()
    }

    #[test]
    fn test_comparison_script() {
        let labels = vec![
            "vary_s".to_string(),
            "vary_b".to_string(),
            "vary_E".to_string(),
        ];
        let series = comparison_series(&records(), &labels, Field::CacheSize, Field::ExecCycles);
        let code = multi_series_plot(series, "All", ("Cache Size (bytes)", "Execution Cycles"))
            .code(Run::Build);

        assert!(code.contains("matplotlib.use(\"Agg\")"));
        assert!(code.contains("plt.legend("));
        assert!(code.contains("plt.title(\"All\", fontsize=12"));
        let lines = plot_lines(&code);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"o\""));
        assert!(lines[0].contains("\"#2196F3\""));
        assert!(lines[0].contains("\"vary_s\""));
        // third style slot, vary_b drew nothing
        assert!(lines[1].contains("\"^\""));
        assert!(lines[1].contains("\"#FF5722\""));
        assert!(lines[1].contains("\"vary_E\""));
        assert!(!code.contains("vary_b"));
    }

    #[test]
    fn test_single_series_script() {
        let series = Series::select(&records(), Some("vary_s"), Field::S, Field::ExecCycles);
        let code = single_series_plot(series, "Set bits", ("s", "cycles")).code(Run::Build);

        assert_eq!(plot_lines(&code).len(), 1);
        assert!(!code.contains("plt.legend("));
        assert!(code.contains("plt.xlabel(\"s\", fontsize=11)"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_render_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // the quote ends the savefig string literal early
        let renderer = ChartRenderer::new(dir.path().join("bad\"dir"), true).unwrap();
        let chart = SweepPlan::default().charts[0].clone();
        assert!(renderer.render(&records(), &chart).is_err());
    }

    #[test]
    fn test_series_style() {
        assert_eq!(series_style(0), ("o", "#2196F3"));
        assert_eq!(series_style(2), ("^", "#FF5722"));
        assert_eq!(series_style(5), ("<", COLORS[0]));
        assert_eq!(series_style(8), (MARKERS[0], COLORS[3]));
    }

    #[test]
    fn test_py_str() {
        assert_eq!(py_str("Cache Size (bytes)"), "\"Cache Size (bytes)\"");
        assert_eq!(py_str("a \"b\""), "\"a \\\"b\\\"\"");
    }

    #[test]
    fn test_disabled_renderer_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("plots");
        let renderer = ChartRenderer::new(&out_dir, false).unwrap();
        assert!(!renderer.enabled());
        assert!(!out_dir.exists());

        for chart in &SweepPlan::default().charts {
            assert_eq!(renderer.render(&records(), chart).unwrap(), None);
        }
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_enabled_renderer_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("plots");
        let renderer = ChartRenderer::new(&out_dir, true).unwrap();
        assert!(out_dir.is_dir());
        assert_eq!(renderer.out_dir(), out_dir);

        // nothing to draw never reaches matplotlib
        let chart = SweepPlan::default().charts[2].clone();
        assert_eq!(renderer.render(&records(), &chart).unwrap(), None);
        let comparison = ChartSpec {
            kind: ChartKind::Comparison {
                labels: vec!["vary_b".to_string()],
            },
            ..chart
        };
        assert_eq!(renderer.render(&records(), &comparison).unwrap(), None);
    }

    #[test]
    fn test_chart_spec_json() {
        let chart: ChartSpec = serde_json::from_str(
            r#"{
                "file": "exp1_set_bits.png",
                "title": "Execution Time vs Set Index Bits",
                "x": "s",
                "y": "exec_cycles",
                "x_label": "Set Index Bits (s)",
                "y_label": "Execution Cycles",
                "kind": "single",
                "label": "vary_s"
            }"#,
        )
        .unwrap();
        assert_eq!(chart, SweepPlan::default().charts[0]);

        let chart: ChartSpec = serde_json::from_str(
            r#"{
                "file": "all.png",
                "title": "All",
                "x": "cache_size",
                "y": "exec_cycles",
                "x_label": "Cache Size (bytes)",
                "y_label": "Execution Cycles",
                "kind": "comparison",
                "labels": ["vary_s", "vary_E"]
            }"#,
        )
        .unwrap();
        assert_eq!(chart.x, Field::CacheSize);
        assert_eq!(
            chart.kind,
            ChartKind::Comparison {
                labels: vec!["vary_s".to_string(), "vary_E".to_string()]
            }
        );
    }
}
