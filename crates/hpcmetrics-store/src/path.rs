// SPDX-License-Identifier: Apache-2.0

//! Addressing a point in the metric-store tree: `cluster → host → nested scope segments`.

use crate::scope::Scope;

/// One segment below the host in a [`MetricPath`]: a scope and, for scopes that have multiple
/// instances per node (e.g. `socket 0`, `socket 1`), the instance id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeSegment {
    /// The scope this segment narrows into.
    pub scope: Scope,
    /// Instance id within the parent, e.g. `"0"` for `socket 0`. `None` for `Scope::Node`.
    pub type_id: Option<String>,
}

/// Full path from the store root to a specific Level: `(cluster, host, nested segments)`.
///
/// A path with an empty `segments` vector addresses the host itself, i.e. `Scope::Node`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricPath {
    /// Cluster name.
    pub cluster: String,
    /// Hostname within the cluster.
    pub host: String,
    /// Scope segments below the host, ordered from coarse to fine.
    pub segments: Vec<ScopeSegment>,
}

impl MetricPath {
    /// A path addressing the node scope directly.
    #[must_use]
    pub fn node(cluster: impl Into<String>, host: impl Into<String>) -> Self {
        MetricPath {
            cluster: cluster.into(),
            host: host.into(),
            segments: Vec::new(),
        }
    }

    /// Appends a scope segment, returning the extended path.
    #[must_use]
    pub fn with_segment(mut self, scope: Scope, type_id: impl Into<String>) -> Self {
        self.segments.push(ScopeSegment {
            scope,
            type_id: Some(type_id.into()),
        });
        self
    }

    /// The scope this path addresses: the last segment's scope, or `Scope::Node` if there are
    /// no segments.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.segments.last().map_or(Scope::Node, |s| s.scope)
    }
}
