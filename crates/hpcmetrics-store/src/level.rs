// SPDX-License-Identifier: Apache-2.0

//! A single node in the metric-store tree.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::chain::Chain;
use crate::registry::MetricId;

/// One node in the metric-store tree: a set of metric ring-buffer chains plus child Levels,
/// guarded by its own read/write lock.
///
/// Multi-Level operations acquire locks in depth-first order and release each before descending,
/// so a parent is never held locked while a child lock is acquired, which rules out deadlock
/// under that invariant.
#[derive(Default)]
pub struct Level {
    children: RwLock<HashMap<String, Arc<Level>>>,
    metrics: RwLock<HashMap<MetricId, Chain>>,
}

impl Level {
    /// Creates an empty Level.
    #[must_use]
    pub fn new() -> Self {
        Level::default()
    }

    /// Returns the child keyed by `name`, lazily creating it if absent.
    pub fn child_or_create(&self, name: &str) -> Arc<Level> {
        if let Some(child) = self.children.read().get(name) {
            return Arc::clone(child);
        }
        let mut children = self.children.write();
        Arc::clone(
            children
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(Level::new())),
        )
    }

    /// Returns the child keyed by `name`, if it has been observed.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<Arc<Level>> {
        self.children.read().get(name).cloned()
    }

    /// All children, for traversal (health checks, cleanup, scoped aggregation).
    #[must_use]
    pub fn children_snapshot(&self) -> Vec<(String, Arc<Level>)> {
        self.children
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    /// Appends a sample to the named metric's chain, creating the chain if this is its first
    /// sample at this Level.
    pub fn write(
        &self,
        metric: MetricId,
        timestamp: i64,
        frequency: u32,
        value: f32,
    ) -> Result<(), crate::chain::WriteRejection> {
        let mut metrics = self.metrics.write();
        metrics.entry(metric).or_default().write(timestamp, frequency, value)
    }

    /// Runs `f` against the named metric's chain, if any samples have been recorded for it.
    pub fn with_chain<R>(&self, metric: MetricId, f: impl FnOnce(&Chain) -> R) -> Option<R> {
        let metrics = self.metrics.read();
        metrics.get(&metric).map(f)
    }

    /// Runs `f` against every chain at this Level, for health checks and memory accounting.
    pub fn for_each_chain(&self, mut f: impl FnMut(MetricId, &Chain)) {
        let metrics = self.metrics.read();
        for (id, chain) in metrics.iter() {
            f(*id, chain);
        }
    }

    /// Runs `f` against every chain at this Level with mutable access, for retention cleanup.
    pub fn for_each_chain_mut(&self, mut f: impl FnMut(MetricId, &mut Chain)) {
        let mut metrics = self.metrics.write();
        for (id, chain) in metrics.iter_mut() {
            f(*id, chain);
        }
    }
}
