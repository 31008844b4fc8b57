// SPDX-License-Identifier: Apache-2.0

//! `resampling.*`: when the dispatcher is allowed to hand back a coarser series than the one a
//! caller asked for.

use serde::{Deserialize, Serialize};

/// `resampling.trigger` / `resampling.resolutions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ResamplingConfig {
    /// Minimum number of raw points a series must have before resampling is even considered.
    #[serde(default = "default_trigger")]
    pub trigger: u32,
    /// Resolutions, in seconds, offered to the front end as explicit choices, largest-to-smallest
    /// native sampling interval first.
    #[serde(default = "default_resolutions")]
    pub resolutions: Vec<u32>,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        ResamplingConfig { trigger: default_trigger(), resolutions: default_resolutions() }
    }
}

impl ResamplingConfig {
    /// Whether a series with `num_points` raw samples should be resampled at all.
    #[must_use]
    pub fn should_resample(&self, num_points: u32) -> bool {
        num_points >= self.trigger
    }
}

fn default_trigger() -> u32 {
    1024
}

fn default_resolutions() -> Vec<u32> {
    vec![600, 300, 120, 60]
}
