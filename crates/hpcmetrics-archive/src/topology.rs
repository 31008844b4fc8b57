// SPDX-License-Identifier: Apache-2.0

//! Static cluster/subcluster topology: `cluster.json`, loaded once at startup through
//! [`crate::backend::ArchiveBackend::load_cluster_cfg`]. There is no separate `clusters` block in
//! application configuration; this document is the sole source of per-metric frequency,
//! thresholds, and node-list membership.

use std::collections::HashMap;

use hpcmetrics_nodelist::{NodeList, ParseError};
use serde::{Deserialize, Serialize};

/// The four threshold bands a metric's current value is compared against when rendering a
/// node/job's health colouring. All four are optional since not every metric defines a full set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetricThresholds {
    /// Expected steady-state value.
    #[serde(default)]
    pub normal: Option<f64>,
    /// Value at or above (or, if `lower_is_better`, at or below) which the metric is a caution.
    #[serde(default)]
    pub caution: Option<f64>,
    /// Value at or above (or below) which the metric is an alert.
    #[serde(default)]
    pub alert: Option<f64>,
    /// Theoretical maximum the hardware can sustain.
    #[serde(default)]
    pub peak: Option<f64>,
}

/// Per-metric static configuration: sampling frequency plus the threshold bands and
/// directionality used to colour it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetricTopology {
    /// Sampling frequency, in seconds.
    pub frequency: u32,
    /// Unit string shown alongside the metric (e.g. `"flops/s"`).
    #[serde(default)]
    pub unit: String,
    /// Whether a lower value is better (e.g. load imbalance), inverting threshold comparisons.
    #[serde(default)]
    pub lower_is_better: bool,
    /// Threshold bands for this metric.
    #[serde(default)]
    pub thresholds: MetricThresholds,
}

/// A subcluster's static topology: node hierarchy shape, node-list membership, and per-metric
/// overrides layered on top of the cluster-wide metric table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubCluster {
    /// Subcluster name, unique within its cluster.
    pub name: String,
    /// Node-list expression covering every node in this subcluster.
    pub node_list: String,
    /// Sockets per node.
    #[serde(default)]
    pub sockets_per_node: u32,
    /// Cores per socket.
    #[serde(default)]
    pub cores_per_socket: u32,
    /// Hardware threads per core.
    #[serde(default = "default_threads_per_core")]
    pub threads_per_core: u32,
    /// Accelerator devices per node.
    #[serde(default)]
    pub accelerators_per_node: u32,
    /// Metrics summarised into a job's footprint when it ran on this subcluster.
    #[serde(default)]
    pub footprint_metrics: Vec<String>,
    /// Per-metric overrides layered over the cluster-wide table in [`ClusterTopology::metrics`].
    #[serde(default)]
    pub metric_overrides: HashMap<String, MetricTopology>,
}

fn default_threads_per_core() -> u32 {
    1
}

impl SubCluster {
    /// Parses this subcluster's node-list expression.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ParseError`] if the expression is malformed.
    pub fn parse_node_list(&self) -> Result<NodeList, ParseError> {
        NodeList::parse(&self.node_list)
    }

    /// Total accelerator count across the subcluster, used by the archiver's scope-selection
    /// heuristic (`numAcc > 0` adds accelerator scope).
    #[must_use]
    pub fn has_accelerators(&self) -> bool {
        self.accelerators_per_node > 0
    }
}

/// A cluster's static topology document, `cluster.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterTopology {
    /// Cluster name.
    pub name: String,
    /// Cluster-wide metric table: frequency, unit, thresholds, directionality. Subclusters may
    /// override entries via `metric_overrides`.
    pub metrics: HashMap<String, MetricTopology>,
    /// The cluster's subclusters.
    pub sub_clusters: Vec<SubCluster>,
}

impl ClusterTopology {
    /// Resolves a metric's effective topology for `sub_cluster`, preferring the subcluster's
    /// override over the cluster-wide table.
    #[must_use]
    pub fn metric_for(&self, sub_cluster: &str, metric: &str) -> Option<&MetricTopology> {
        if let Some(sc) = self.sub_clusters.iter().find(|s| s.name == sub_cluster) {
            if let Some(m) = sc.metric_overrides.get(metric) {
                return Some(m);
            }
        }
        self.metrics.get(metric)
    }

    /// Every subcluster membership, parsed, for [`crate::subcluster::assign_subcluster`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] encountered across any subcluster's node-list expression.
    pub fn memberships(&self) -> Result<Vec<crate::subcluster::SubclusterMembership>, ParseError> {
        self.sub_clusters
            .iter()
            .map(|sc| Ok(crate::subcluster::SubclusterMembership { name: sc.name.clone(), nodes: sc.parse_node_list()? }))
            .collect()
    }

    /// Parses a `cluster.json` document as loaded through
    /// [`crate::backend::ArchiveBackend::load_cluster_cfg`].
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the document does not match the expected shape.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Serializes this topology back to `cluster.json` bytes, for
    /// [`crate::backend::ArchiveBackend::store_cluster_cfg`].
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails, which in practice never happens
    /// for this type.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClusterTopology {
        let mut metrics = HashMap::new();
        let _ = metrics.insert(
            "flops_any".to_owned(),
            MetricTopology {
                frequency: 30,
                unit: "flops/s".to_owned(),
                lower_is_better: false,
                thresholds: MetricThresholds { normal: Some(100.0), caution: Some(10.0), alert: Some(1.0), peak: Some(200.0) },
            },
        );
        ClusterTopology {
            name: "fritz".to_owned(),
            metrics,
            sub_clusters: vec![SubCluster {
                name: "genoa".to_owned(),
                node_list: "fritz[0001-0500]".to_owned(),
                sockets_per_node: 2,
                cores_per_socket: 64,
                threads_per_core: 1,
                accelerators_per_node: 0,
                footprint_metrics: vec!["flops_any".to_owned()],
                metric_overrides: HashMap::new(),
            }],
        }
    }

    #[test]
    fn round_trips_through_json() {
        let topo = sample();
        let bytes = topo.to_json().expect("serialize");
        let parsed = ClusterTopology::from_json(&bytes).expect("deserialize");
        assert_eq!(parsed.name, "fritz");
        assert_eq!(parsed.sub_clusters.len(), 1);
    }

    #[test]
    fn subcluster_override_beats_cluster_wide_table() {
        let mut topo = sample();
        topo.sub_clusters[0].metric_overrides.insert(
            "flops_any".to_owned(),
            MetricTopology {
                frequency: 10,
                unit: "flops/s".to_owned(),
                lower_is_better: false,
                thresholds: MetricThresholds::default(),
            },
        );
        let resolved = topo.metric_for("genoa", "flops_any").expect("present");
        assert_eq!(resolved.frequency, 10);
    }

    #[test]
    fn falls_back_to_cluster_wide_table() {
        let topo = sample();
        let resolved = topo.metric_for("genoa", "flops_any").expect("present");
        assert_eq!(resolved.frequency, 30);
    }

    #[test]
    fn memberships_parses_every_subcluster_node_list() {
        let topo = sample();
        let memberships = topo.memberships().expect("valid node lists");
        assert_eq!(memberships.len(), 1);
        assert!(memberships[0].nodes.contains("fritz0042"));
    }
}
