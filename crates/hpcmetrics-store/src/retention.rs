// SPDX-License-Identifier: Apache-2.0

//! Periodic retention/cleanup worker.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::store::MetricStore;

/// What a cleanup pass does with chunks past their retention window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    /// Drop old chunks outright.
    Delete,
    /// Hand old chunks to the archive backend before dropping them.
    ///
    /// This worker only performs the drop; moving data to the archive backend first is the
    /// archiver pipeline's responsibility, triggered separately before a cluster's retention
    /// window is about to close.
    Archive,
}

/// Configuration for the retention worker.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// How often to sweep.
    pub interval: Duration,
    /// Cleanup mode.
    pub mode: CleanupMode,
    /// Default retention window, applied when no cluster- or subcluster-specific override
    /// exists.
    pub default_retention_secs: i64,
    /// Per-cluster retention overrides, by cluster name.
    pub cluster_overrides: std::collections::HashMap<String, i64>,
}

/// Spawns the periodic retention worker. Runs until `cancel` is triggered.
pub fn spawn(
    store: Arc<MetricStore>,
    clusters: Vec<String>,
    config: RetentionConfig,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("retention worker shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    run_sweep(&store, &clusters, &config);
                }
            }
        }
    })
}

fn run_sweep(store: &MetricStore, clusters: &[String], config: &RetentionConfig) {
    let now = now_unix();
    for cluster in clusters {
        let retention = config
            .cluster_overrides
            .get(cluster)
            .copied()
            .unwrap_or(config.default_retention_secs);
        let freed = store.evict_cluster_before(cluster, now, retention);
        if freed > 0 {
            tracing::debug!(cluster = %cluster, freed, "retention sweep freed samples");
        }
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
