//! Walk tunables: proximity threshold and initial fiber sets.

use serde::{Deserialize, Serialize};

use crate::errors::{PeercheckError, PeercheckResult};
use crate::geometry::THRESHOLD_M;

/// Fiber count of the trunk line leaving a vault (`<vault>.DF<n>.48A`).
pub const DEFAULT_TRUNK_FIBER_COUNT: u32 = 48;
/// Fibers walked by the deep audit pass.
pub const DEFAULT_DEEP_INITIAL_FIBERS: u32 = 48;
/// Fibers walked by the lighter order/path summary pass.
pub const DEFAULT_SUMMARY_INITIAL_FIBERS: u32 = 12;

const ENV_THRESHOLD_M: &str = "PEERCHECK_THRESHOLD_M";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkConfig {
    pub threshold_m: f64,
    pub trunk_fiber_count: u32,
    pub deep_initial_fibers: u32,
    pub summary_initial_fibers: u32,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            threshold_m: THRESHOLD_M,
            trunk_fiber_count: DEFAULT_TRUNK_FIBER_COUNT,
            deep_initial_fibers: DEFAULT_DEEP_INITIAL_FIBERS,
            summary_initial_fibers: DEFAULT_SUMMARY_INITIAL_FIBERS,
        }
    }
}

impl WalkConfig {
    /// Parse and validate a JSON object; missing keys take their defaults.
    pub fn from_json_str(raw: &str) -> PeercheckResult<Self> {
        let config: WalkConfig = serde_json::from_str(raw)?;
        config.validate()
    }

    /// Defaults, with `PEERCHECK_THRESHOLD_M` applied when set.
    pub fn from_env() -> PeercheckResult<Self> {
        Self::default()
            .with_threshold_override(std::env::var(ENV_THRESHOLD_M).ok().as_deref())?
            .validate()
    }

    fn with_threshold_override(mut self, raw: Option<&str>) -> PeercheckResult<Self> {
        if let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) {
            self.threshold_m = raw.parse().map_err(|_| {
                PeercheckError::Config(format!("{ENV_THRESHOLD_M} is not a number: {raw:?}"))
            })?;
        }
        Ok(self)
    }

    pub fn validate(self) -> PeercheckResult<Self> {
        if !self.threshold_m.is_finite() || self.threshold_m <= 0.0 {
            return Err(PeercheckError::Config(format!(
                "threshold_m must be a positive number, got {}",
                self.threshold_m
            )));
        }
        for (name, value) in [
            ("trunk_fiber_count", self.trunk_fiber_count),
            ("deep_initial_fibers", self.deep_initial_fibers),
            ("summary_initial_fibers", self.summary_initial_fibers),
        ] {
            if value == 0 {
                return Err(PeercheckError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(self)
    }

    pub fn deep_indices(&self) -> Vec<u32> {
        (1..=self.deep_initial_fibers).collect()
    }

    pub fn summary_indices(&self) -> Vec<u32> {
        (1..=self.summary_initial_fibers).collect()
    }
}
