// SPDX-License-Identifier: MIT
//! Tracker configuration (`[tracker]` section in a host's config file).

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Tuning knobs for a [`crate::StatusTracker`].
///
/// All fields default, so an empty TOML table (or `Default::default()`)
/// yields a working configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Quiet window before a recomputation, in milliseconds.
    ///
    /// Filesystem events arriving inside the window re-arm it; the scan
    /// runs once no event has arrived for a full window. Default: 150.
    pub debounce_ms: u64,
    /// Report untracked files in the status scan. Default: true.
    pub include_untracked: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            include_untracked: true,
        }
    }
}

impl TrackerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
