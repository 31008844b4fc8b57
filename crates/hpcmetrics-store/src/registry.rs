// SPDX-License-Identifier: Apache-2.0

//! Dense integer offsets for metric names, assigned once at startup.

use std::collections::HashMap;

/// Dense offset identifying a metric within a cluster's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricId(pub u32);

/// Maps metric names to a dense `MetricId` and their configured sampling frequency.
///
/// Built once from cluster configuration at startup; per-Level storage then indexes metric
/// buffers by `MetricId.0` rather than hashing the name on every write.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    by_name: HashMap<String, MetricId>,
    frequencies: Vec<u32>,
}

impl MetricRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        MetricRegistry::default()
    }

    /// Registers `name` with the given sampling frequency (seconds per sample), returning its
    /// id. Re-registering an existing name returns its original id unchanged.
    pub fn register(&mut self, name: impl Into<String>, frequency_secs: u32) -> MetricId {
        let name = name.into();
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }
        let id = MetricId(self.frequencies.len() as u32);
        self.frequencies.push(frequency_secs);
        let _ = self.by_name.insert(name, id);
        id
    }

    /// Looks up a metric's id by name.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<MetricId> {
        self.by_name.get(name).copied()
    }

    /// The configured frequency for a metric id.
    #[must_use]
    pub fn frequency(&self, id: MetricId) -> u32 {
        self.frequencies[id.0 as usize]
    }

    /// Number of registered metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Returns `true` if no metric has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}
