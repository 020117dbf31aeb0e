use serde::{Deserialize, Serialize};
use std::fmt;

/// Baseline set index bits used by the single-parameter sweeps
pub const BASE_S: u32 = 5;
/// Baseline associativity used by the single-parameter sweeps
pub const BASE_E: u32 = 4;
/// Baseline block offset bits used by the single-parameter sweeps
pub const BASE_B: u32 = 4;
/// Capacity shared by all constant-capacity sweeps, in bytes
pub const FIXED_CACHE_BYTES: u64 = 2048;

/// Geometry of one L1 cache as passed to the simulator
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheGeometry {
    /// set index bits: 2^s sets
    pub s: u32,
    /// associativity: ways per set
    #[serde(rename = "E")]
    pub e: u32,
    /// block offset bits: 2^b bytes per line
    pub b: u32,
}

impl CacheGeometry {
    pub const fn new(s: u32, e: u32, b: u32) -> Self {
        Self { s, e, b }
    }

    pub fn baseline() -> Self {
        Self::new(BASE_S, BASE_E, BASE_B)
    }

    /// Capacity in bytes: 2^s * E * 2^b
    ///
    /// Callers are expected to keep `s` and `b` in the range accepted by
    /// `SweepPlan::validate`.
    pub fn cache_size(&self) -> u64 {
        (1u64 << self.s) * self.e as u64 * (1u64 << self.b)
    }

    /// Same as `cache_size`, but `None` instead of overflowing
    pub fn checked_cache_size(&self) -> Option<u64> {
        let sets = 1u64.checked_shl(self.s)?;
        let block = 1u64.checked_shl(self.b)?;
        sets.checked_mul(self.e as u64)?.checked_mul(block)
    }
}

impl fmt::Display for CacheGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s={}, E={}, b={}", self.s, self.e, self.b)
    }
}

/// One simulator invocation: a geometry tagged with the sweep it belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrialParams {
    pub label: String,
    pub geometry: CacheGeometry,
}

impl TrialParams {
    pub fn new(label: &str, geometry: CacheGeometry) -> Self {
        Self {
            label: label.to_string(),
            geometry,
        }
    }

    pub fn cache_size(&self) -> u64 {
        self.geometry.cache_size()
    }
}
