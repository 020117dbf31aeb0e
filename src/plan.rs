use crate::{
    BASE_B, BASE_E, BASE_S, CacheGeometry, ChartKind, ChartSpec, FIXED_CACHE_BYTES, Field,
    TrialParams,
};
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

/// Largest accepted value of `s` and `b`
const MAX_BITS: u32 = 31;

/// A named sequence of trials
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Sweep {
    /// Label recorded in every result of this sweep
    pub label: String,
    /// Printed when the sweep starts
    pub description: String,
    /// All trials share the plan's fixed capacity
    #[serde(default)]
    pub constant_capacity: bool,
    /// Trials in execution order
    pub trials: Vec<CacheGeometry>,
}

impl Sweep {
    pub fn params(&self) -> impl Iterator<Item = TrialParams> + '_ {
        self.trials
            .iter()
            .map(|geometry| TrialParams::new(&self.label, *geometry))
    }
}

/// Everything one sweep run does: the sweeps in order, then the charts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SweepPlan {
    /// Capacity in bytes of constant capacity sweeps
    pub fixed_capacity: u64,
    pub sweeps: Vec<Sweep>,
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
}

fn single(file: &str, title: &str, x: Field, x_label: &str, label: &str) -> ChartSpec {
    ChartSpec {
        file: file.to_string(),
        title: title.to_string(),
        x,
        y: Field::ExecCycles,
        x_label: x_label.to_string(),
        y_label: "Execution Cycles".to_string(),
        kind: ChartKind::Single {
            label: Some(label.to_string()),
        },
    }
}

fn comparison(file: &str, title: &str, x: Field, x_label: &str, labels: &[&str]) -> ChartSpec {
    ChartSpec {
        file: file.to_string(),
        title: title.to_string(),
        x,
        y: Field::ExecCycles,
        x_label: x_label.to_string(),
        y_label: "Execution Cycles".to_string(),
        kind: ChartKind::Comparison {
            labels: labels.iter().map(|label| label.to_string()).collect(),
        },
    }
}

impl Default for SweepPlan {
    fn default() -> Self {
        let fixed = FIXED_CACHE_BYTES;
        let geometries = |triples: &[(u32, u32, u32)]| {
            triples
                .iter()
                .map(|&(s, e, b)| CacheGeometry::new(s, e, b))
                .collect::<Vec<_>>()
        };

        let sweeps = vec![
            Sweep {
                label: "vary_s".to_string(),
                description: "Varying set index bits".to_string(),
                constant_capacity: false,
                trials: (2..=10)
                    .map(|s| CacheGeometry::new(s, BASE_E, BASE_B))
                    .collect(),
            },
            Sweep {
                label: "vary_E".to_string(),
                description: "Varying associativity".to_string(),
                constant_capacity: false,
                trials: [1, 2, 4, 8, 16, 32, 64]
                    .into_iter()
                    .map(|e| CacheGeometry::new(BASE_S, e, BASE_B))
                    .collect(),
            },
            Sweep {
                label: "vary_b".to_string(),
                description: "Varying block bits".to_string(),
                constant_capacity: false,
                trials: (3..=8)
                    .map(|b| CacheGeometry::new(BASE_S, BASE_E, b))
                    .collect(),
            },
            Sweep {
                label: "const_cache_sb".to_string(),
                description: format!("Constant cache ({fixed}B), varying s and b"),
                constant_capacity: true,
                trials: geometries(&[
                    (2, 4, 7),
                    (3, 4, 6),
                    (4, 4, 5),
                    (5, 4, 4),
                    (6, 4, 3),
                    (7, 4, 2),
                ]),
            },
            Sweep {
                label: "const_cache_eb".to_string(),
                description: format!("Constant cache ({fixed}B), varying E and b"),
                constant_capacity: true,
                trials: geometries(&[(5, 2, 5), (5, 4, 4), (5, 8, 3), (5, 16, 2)]),
            },
            Sweep {
                label: "const_cache_se".to_string(),
                description: format!("Constant cache ({fixed}B), varying s and E"),
                constant_capacity: true,
                trials: geometries(&[(3, 32, 3), (4, 16, 3), (5, 8, 3), (6, 4, 3), (7, 2, 3)]),
            },
        ];

        let charts = vec![
            single(
                "exp1_set_bits.png",
                "Execution Time vs Set Index Bits",
                Field::S,
                "Set Index Bits (s)",
                "vary_s",
            ),
            single(
                "exp2_associativity.png",
                "Execution Time vs Associativity",
                Field::E,
                "Associativity (E)",
                "vary_E",
            ),
            single(
                "exp3_block_bits.png",
                "Execution Time vs Block Bits",
                Field::B,
                "Block Bits (b)",
                "vary_b",
            ),
            single(
                "exp4_const_cache_s.png",
                &format!("Execution Time vs Set Bits (Fixed {fixed}B Cache)"),
                Field::S,
                "Set Index Bits (s)",
                "const_cache_sb",
            ),
            single(
                "exp5_const_cache_E.png",
                &format!("Execution Time vs Associativity (Fixed {fixed}B Cache)"),
                Field::E,
                "Associativity (E)",
                "const_cache_eb",
            ),
            single(
                "exp6_const_cache_se.png",
                &format!("Execution Time vs Set Bits (Fixed {fixed}B Cache, b=3)"),
                Field::S,
                "Set Index Bits (s)",
                "const_cache_se",
            ),
            comparison(
                "comparison_cache_size.png",
                "Execution Time vs Cache Size (Different Parameters)",
                Field::CacheSize,
                "Cache Size (bytes)",
                &["vary_s", "vary_E", "vary_b"],
            ),
            comparison(
                "comparison_const_cache.png",
                &format!("Execution Time Comparison (Fixed {fixed}B Cache)"),
                Field::S,
                "Set Index Bits (s)",
                &["const_cache_sb", "const_cache_eb", "const_cache_se"],
            ),
        ];

        Self {
            fixed_capacity: fixed,
            sweeps,
            charts,
        }
    }
}

impl SweepPlan {
    /// Load a plan from json and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open sweep plan {}", path.display()))?;
        let plan: SweepPlan = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse sweep plan {}", path.display()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Check labels, geometry ranges and the constant capacity invariant
    pub fn validate(&self) -> anyhow::Result<()> {
        for (index, sweep) in self.sweeps.iter().enumerate() {
            if sweep.label.is_empty() {
                bail!("sweep {index} has an empty label");
            }
            if self.sweeps[..index]
                .iter()
                .any(|other| other.label == sweep.label)
            {
                bail!("duplicate sweep label {}", sweep.label);
            }

            for geometry in &sweep.trials {
                if geometry.e == 0 || geometry.s > MAX_BITS || geometry.b > MAX_BITS {
                    bail!("[{}] invalid geometry {}", sweep.label, geometry);
                }
                let Some(size) = geometry.checked_cache_size() else {
                    bail!("[{}] capacity of {} overflows", sweep.label, geometry);
                };
                if sweep.constant_capacity && size != self.fixed_capacity {
                    bail!(
                        "[{}] {} gives {} bytes instead of {} bytes",
                        sweep.label,
                        geometry,
                        size,
                        self.fixed_capacity
                    );
                }
            }
        }
        Ok(())
    }

    pub fn num_trials(&self) -> usize {
        self.sweeps.iter().map(|sweep| sweep.trials.len()).sum()
    }
}
