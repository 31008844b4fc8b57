// SPDX-License-Identifier: Apache-2.0

//! `metric-config.*`: the global metric lists shown on the job list, job view plot, and job view
//! table, plus per-(sub)cluster overrides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `metric-config.job-list-metrics` / `job-view-plot-metrics` / `job-view-table-metrics`, plus
/// `metric-config.clusters[].sub-clusters[].*-metrics` overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct MetricConfig {
    /// Metrics shown as columns in the job list, cluster-wide default.
    #[serde(default)]
    pub job_list_metrics: Vec<String>,
    /// Metrics plotted in the job view, cluster-wide default.
    #[serde(default)]
    pub job_view_plot_metrics: Vec<String>,
    /// Metrics tabulated in the job view, cluster-wide default.
    #[serde(default)]
    pub job_view_table_metrics: Vec<String>,
    /// Per-cluster overrides, keyed by cluster name.
    #[serde(default)]
    pub clusters: HashMap<String, ClusterMetricConfig>,
}

/// Per-cluster metric list overrides, themselves overridable per sub-cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ClusterMetricConfig {
    /// Overrides the job-list metric columns for this cluster.
    #[serde(default)]
    pub job_list_metrics: Option<Vec<String>>,
    /// Overrides the job-view plot metrics for this cluster.
    #[serde(default)]
    pub job_view_plot_metrics: Option<Vec<String>>,
    /// Overrides the job-view table metrics for this cluster.
    #[serde(default)]
    pub job_view_table_metrics: Option<Vec<String>>,
    /// Per-sub-cluster overrides, keyed by sub-cluster name.
    #[serde(default)]
    pub sub_clusters: HashMap<String, SubClusterMetricConfig>,
}

/// Per-sub-cluster metric list overrides, the narrowest scope in the override chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SubClusterMetricConfig {
    /// Overrides the job-list metric columns for this sub-cluster.
    #[serde(default)]
    pub job_list_metrics: Option<Vec<String>>,
    /// Overrides the job-view plot metrics for this sub-cluster.
    #[serde(default)]
    pub job_view_plot_metrics: Option<Vec<String>>,
    /// Overrides the job-view table metrics for this sub-cluster.
    #[serde(default)]
    pub job_view_table_metrics: Option<Vec<String>>,
}

impl MetricConfig {
    /// Resolves the job-list metric columns for `cluster`/`sub_cluster`, falling back from the
    /// narrowest override to the cluster-wide default.
    #[must_use]
    pub fn job_list_metrics_for(&self, cluster: &str, sub_cluster: &str) -> Vec<String> {
        self.resolve(cluster, sub_cluster, |s| &s.job_list_metrics, |c| &c.job_list_metrics, &self.job_list_metrics)
    }

    /// Resolves the job-view plot metrics for `cluster`/`sub_cluster`.
    #[must_use]
    pub fn job_view_plot_metrics_for(&self, cluster: &str, sub_cluster: &str) -> Vec<String> {
        self.resolve(
            cluster,
            sub_cluster,
            |s| &s.job_view_plot_metrics,
            |c| &c.job_view_plot_metrics,
            &self.job_view_plot_metrics,
        )
    }

    /// Resolves the job-view table metrics for `cluster`/`sub_cluster`.
    #[must_use]
    pub fn job_view_table_metrics_for(&self, cluster: &str, sub_cluster: &str) -> Vec<String> {
        self.resolve(
            cluster,
            sub_cluster,
            |s| &s.job_view_table_metrics,
            |c| &c.job_view_table_metrics,
            &self.job_view_table_metrics,
        )
    }

    fn resolve(
        &self,
        cluster: &str,
        sub_cluster: &str,
        sub_field: impl Fn(&SubClusterMetricConfig) -> &Option<Vec<String>>,
        cluster_field: impl Fn(&ClusterMetricConfig) -> &Option<Vec<String>>,
        default: &[String],
    ) -> Vec<String> {
        let Some(cluster_cfg) = self.clusters.get(cluster) else {
            return default.to_vec();
        };
        if let Some(sub_cfg) = cluster_cfg.sub_clusters.get(sub_cluster) {
            if let Some(metrics) = sub_field(sub_cfg) {
                return metrics.clone();
            }
        }
        cluster_field(cluster_cfg).clone().unwrap_or_else(|| default.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_through_the_override_chain() {
        let mut cfg = MetricConfig { job_list_metrics: vec!["cpu_load".into()], ..Default::default() };
        let mut cluster = ClusterMetricConfig { job_list_metrics: Some(vec!["mem_used".into()]), ..Default::default() };
        cluster.sub_clusters.insert(
            "gpu".into(),
            SubClusterMetricConfig { job_list_metrics: Some(vec!["flops_any".into()]), ..Default::default() },
        );
        cfg.clusters.insert("fritz".into(), cluster);

        assert_eq!(cfg.job_list_metrics_for("fritz", "gpu"), vec!["flops_any".to_owned()]);
        assert_eq!(cfg.job_list_metrics_for("fritz", "cpu"), vec!["mem_used".to_owned()]);
        assert_eq!(cfg.job_list_metrics_for("unknown", "x"), vec!["cpu_load".to_owned()]);
    }
}
