//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SchedulingError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on a single calendar busy-time lookup. A lookup that takes
    /// longer contributes no busy intervals.
    pub calendar_timeout_ms: u64,

    /// Longest local date range a criteria set may cover.
    pub max_horizon_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            calendar_timeout_ms: 5_000,
            max_horizon_days: 366,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| SchedulingError::RejectedInput(format!("engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.calendar_timeout_ms == 0 {
            return Err(SchedulingError::RejectedInput(
                "calendar_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_horizon_days == 0 {
            return Err(SchedulingError::RejectedInput(
                "max_horizon_days must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn calendar_timeout(&self) -> Duration {
        Duration::from_millis(self.calendar_timeout_ms)
    }
}
