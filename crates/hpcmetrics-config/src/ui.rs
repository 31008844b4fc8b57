// SPDX-License-Identifier: Apache-2.0

//! Front-end display toggles. The data plane never reads these fields itself; they are
//! round-tripped through configuration loading so the HTTP/GraphQL layer can serve them without a
//! second parser, matching the UI's own expectations for initial page state.

use serde::{Deserialize, Serialize};

/// `job-list.use-paging` and `node-list.use-paging`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct JobListConfig {
    /// Default pagination (`true`) vs. continuous scroll (`false`) for the job list.
    #[serde(default = "default_true")]
    pub use_paging: bool,
}

impl Default for JobListConfig {
    fn default() -> Self {
        JobListConfig { use_paging: true }
    }
}

/// `node-list.use-paging`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct NodeListConfig {
    /// Default pagination vs. continuous scroll for the node list.
    #[serde(default = "default_true")]
    pub use_paging: bool,
}

impl Default for NodeListConfig {
    fn default() -> Self {
        NodeListConfig { use_paging: true }
    }
}

/// `job-view.show-polar-plot` / `-footprint` / `-roofline` / `-stat-table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct JobViewConfig {
    /// Whether the polar (radar) plot is visible by default.
    #[serde(default = "default_true")]
    pub show_polar_plot: bool,
    /// Whether the footprint panel is visible by default.
    #[serde(default = "default_true")]
    pub show_footprint: bool,
    /// Whether the roofline plot is visible by default.
    #[serde(default = "default_true")]
    pub show_roofline: bool,
    /// Whether the statistics table is visible by default.
    #[serde(default = "default_true")]
    pub show_stat_table: bool,
}

impl Default for JobViewConfig {
    fn default() -> Self {
        JobViewConfig {
            show_polar_plot: true,
            show_footprint: true,
            show_roofline: true,
            show_stat_table: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_view_defaults_show_everything() {
        let cfg = JobViewConfig::default();
        assert!(cfg.show_polar_plot && cfg.show_footprint && cfg.show_roofline && cfg.show_stat_table);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = serde_yaml::from_str::<JobListConfig>("use-paging: true\nbogus: 1").unwrap_err();
        assert!(err.to_string().contains("bogus") || err.to_string().contains("unknown field"));
    }
}
