use crate::{CacheGeometry, TrialParams};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome of one successful trial, also one row of the exported csv
///
/// Field order is the column order of the csv header.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TrialResult {
    /// sweep label
    pub experiment: String,
    pub s: u32,
    #[serde(rename = "E")]
    pub e: u32,
    pub b: u32,
    /// capacity in bytes
    pub cache_size: u64,
    /// maximum execution time across cores, in cycles
    pub exec_cycles: u64,
}

impl TrialResult {
    pub fn new(params: &TrialParams, exec_cycles: u64) -> Self {
        Self {
            experiment: params.label.clone(),
            s: params.geometry.s,
            e: params.geometry.e,
            b: params.geometry.b,
            cache_size: params.cache_size(),
            exec_cycles,
        }
    }

    pub fn geometry(&self) -> CacheGeometry {
        CacheGeometry::new(self.s, self.e, self.b)
    }
}

/// Results of one sweep run, in the order the trials completed
#[derive(Clone, Debug, Default)]
pub struct ResultSet {
    results: Vec<TrialResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result; failed trials (`None`) leave the set untouched
    pub fn add(&mut self, result: Option<TrialResult>) {
        if let Some(result) = result {
            self.results.push(result);
        }
    }

    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Distinct sweep labels in order of first appearance
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = vec![];
        for result in &self.results {
            if !labels.contains(&result.experiment.as_str()) {
                labels.push(&result.experiment);
            }
        }
        labels
    }

    /// Write all results as csv, returns whether a file was written
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        if self.results.is_empty() {
            warn!("No data to export, skipping {}", path.display());
            return false;
        }

        match self.write_csv(path) {
            Ok(()) => {
                info!(
                    "Exported {} results to {}",
                    self.results.len(),
                    path.display()
                );
                true
            }
            Err(err) => {
                warn!("Failed to export results to {}: {:#}", path.display(), err);
                false
            }
        }
    }

    fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for result in &self.results {
            writer.serialize(result)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read back a file written by `export_csv`
    pub fn load_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut set = Self::new();
        for record in reader.deserialize() {
            set.add(Some(record?));
        }
        Ok(set)
    }
}
