// SPDX-License-Identifier: Apache-2.0

//! The canonical read shape (`JobData`) and derived min/median/max statistics series.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default series-count threshold above which job reads synthesise a statistics series instead
/// of (or in addition to) returning every raw series.
pub const DEFAULT_JOB_SERIES_THRESHOLD: usize = 15;

/// Default series-count threshold for node-list reads.
pub const DEFAULT_NODE_LIST_SERIES_THRESHOLD: usize = 8;

/// One named, scoped time series plus summary statistics, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    /// The hostname or other identifier this series belongs to.
    pub id: String,
    /// Sample values aligned to the series' timestep, `NAN` for gaps.
    pub data: Vec<f32>,
}

/// Per-timestep min/median/max (and optional percentiles) across a set of series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSeries {
    /// Per-timestep minimum across all input series.
    pub min: Vec<f32>,
    /// Per-timestep median across all input series.
    pub median: Vec<f32>,
    /// Per-timestep maximum across all input series.
    pub max: Vec<f32>,
    /// Additional percentiles, keyed by percentile (e.g. `90` for p90).
    pub percentiles: HashMap<u8, Vec<f32>>,
}

/// One metric's worth of data at one scope, as embedded in [`JobData`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetric {
    /// Seconds between samples.
    pub timestep: u32,
    /// The metric's unit string, as configured.
    pub unit: String,
    /// Raw per-series data; omitted (empty) when only the statistics series is returned.
    pub series: Vec<Series>,
    /// Synthesised summary when `series.len()` exceeds the configured threshold.
    pub statistics_series: Option<StatisticsSeries>,
}

/// The canonical shape returned by job reads: `metric name → scope → JobMetric`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobData {
    /// Metric name to per-scope data.
    pub metrics: HashMap<String, HashMap<String, JobMetric>>,
}

/// Synthesises a [`StatisticsSeries`] across `series` if its length exceeds `threshold`.
///
/// All input series are assumed aligned to the same timestep; shorter series pad with `NAN` for
/// the purpose of computing min/max but do not contribute to the median unless present.
#[must_use]
pub fn derive_statistics_series(series: &[Series], threshold: usize) -> Option<StatisticsSeries> {
    if series.len() <= threshold {
        return None;
    }
    let width = series.iter().map(|s| s.data.len()).max().unwrap_or(0);
    let mut min = vec![f32::NAN; width];
    let mut median = vec![f32::NAN; width];
    let mut max = vec![f32::NAN; width];

    for t in 0..width {
        let mut column: Vec<f32> = series
            .iter()
            .filter_map(|s| s.data.get(t).copied())
            .filter(|v| !v.is_nan())
            .collect();
        if column.is_empty() {
            continue;
        }
        column.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN values are totally ordered"));
        min[t] = column[0];
        max[t] = column[column.len() - 1];
        median[t] = percentile(&column, 50);
    }

    Some(StatisticsSeries {
        min,
        median,
        max,
        percentiles: HashMap::new(),
    })
}

/// Nearest-rank percentile over an already-sorted, non-empty slice.
fn percentile(sorted: &[f32], p: u8) -> f32 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = ((f64::from(p) / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[&[f32]]) -> Vec<Series> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Series {
                id: format!("n{i}"),
                data: v.to_vec(),
            })
            .collect()
    }

    #[test]
    fn below_threshold_returns_none() {
        let s = series(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert!(derive_statistics_series(&s, 15).is_none());
    }

    #[test]
    fn above_threshold_computes_min_median_max() {
        let data: Vec<Vec<f32>> = (0..20).map(|i| vec![i as f32]).collect();
        let s: Vec<Series> = data
            .iter()
            .enumerate()
            .map(|(i, v)| Series { id: format!("n{i}"), data: v.clone() })
            .collect();
        let stats = derive_statistics_series(&s, 15).expect("above threshold");
        assert_eq!(stats.min[0], 0.0);
        assert_eq!(stats.max[0], 19.0);
    }

    #[test]
    fn nan_gaps_are_excluded_from_the_column() {
        let s = series(&(0..16).map(|_| [1.0f32, 2.0].as_slice()).collect::<Vec<_>>());
        let mut s = s;
        s[0].data[0] = f32::NAN;
        let stats = derive_statistics_series(&s, 15).expect("above threshold");
        assert!(!stats.min[0].is_nan());
    }
}
