// SPDX-License-Identifier: Apache-2.0

//! The retention worker's policy: cleanup mode, sweep interval, and per-cluster/per-subcluster
//! retention overrides.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What a cleanup pass does with chunks past their retention window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupMode {
    /// Drop old chunks outright.
    Delete,
    /// Hand old chunks to the archive backend before dropping them.
    Archive,
}

/// Retention worker configuration: `cleanup.mode` / `interval` / `directory`, plus per-cluster and
/// per-subcluster overrides for the retention window itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CleanupConfig {
    /// `delete` or `archive`.
    #[serde(default = "default_mode")]
    pub mode: CleanupMode,
    /// How often the retention worker sweeps.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Directory the `archive` mode moves chunks under, before the archive backend's own
    /// addressing scheme takes over. Unused in `delete` mode.
    #[serde(default)]
    pub directory: Option<String>,
    /// Default retention window applied when no cluster- or subcluster-specific override exists.
    #[serde(default = "default_retention", with = "humantime_serde")]
    pub default_retention: Duration,
    /// Per-cluster retention overrides, keyed by cluster name.
    #[serde(default)]
    pub cluster_overrides: HashMap<String, HumanDuration>,
    /// Per-subcluster retention overrides, keyed by `cluster/subcluster`.
    #[serde(default)]
    pub sub_cluster_overrides: HashMap<String, HumanDuration>,
}

/// A `Duration` that (de)serializes via `humantime`, usable as a map value (the `with` attribute
/// only applies to struct fields, not to generic map value types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HumanDuration(#[serde(with = "humantime_serde")] pub Duration);

impl Default for CleanupConfig {
    fn default() -> Self {
        CleanupConfig {
            mode: default_mode(),
            interval: default_interval(),
            directory: None,
            default_retention: default_retention(),
            cluster_overrides: HashMap::new(),
            sub_cluster_overrides: HashMap::new(),
        }
    }
}

impl CleanupConfig {
    /// Resolves the retention window for a cluster, falling back to the global default.
    #[must_use]
    pub fn retention_for_cluster(&self, cluster: &str) -> Duration {
        self.cluster_overrides.get(cluster).map_or(self.default_retention, |d| d.0)
    }

    /// Resolves the retention window for a subcluster, falling back through the cluster override
    /// to the global default.
    #[must_use]
    pub fn retention_for_sub_cluster(&self, cluster: &str, sub_cluster: &str) -> Duration {
        let key = format!("{cluster}/{sub_cluster}");
        self.sub_cluster_overrides
            .get(&key)
            .map_or_else(|| self.retention_for_cluster(cluster), |d| d.0)
    }
}

fn default_mode() -> CleanupMode {
    CleanupMode::Delete
}

fn default_interval() -> Duration {
    Duration::from_secs(4 * 60 * 60)
}

fn default_retention() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcluster_override_beats_cluster_override_beats_default() {
        let mut cfg = CleanupConfig::default();
        cfg.cluster_overrides.insert("fritz".into(), HumanDuration(Duration::from_secs(10)));
        cfg.sub_cluster_overrides.insert("fritz/gpu".into(), HumanDuration(Duration::from_secs(5)));

        assert_eq!(cfg.retention_for_sub_cluster("fritz", "gpu"), Duration::from_secs(5));
        assert_eq!(cfg.retention_for_sub_cluster("fritz", "cpu"), Duration::from_secs(10));
        assert_eq!(cfg.retention_for_cluster("alex"), cfg.default_retention);
    }

    #[test]
    fn parses_humantime_durations() {
        let yaml = "mode: archive\ninterval: 1h\ndefault-retention: 30d\n";
        let cfg: CleanupConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.mode, CleanupMode::Archive);
        assert_eq!(cfg.interval, Duration::from_secs(3600));
    }
}
