// SPDX-License-Identifier: Apache-2.0

//! In-memory hierarchical metric store.
//!
//! Holds every sample currently resident for every monitored cluster, keyed by
//! `cluster → host → nested node-hierarchy scope`. Writers append to per-metric ring-buffer
//! chains under a Level's lock; readers walk the tree read-only, aggregating across children
//! when a read is requested at a coarser scope than samples were recorded at.

mod chain;
mod error;
mod level;
pub mod memory;
mod path;
pub mod registry;
pub mod retention;
mod scope;
mod store;
pub mod stats;

pub use chain::{Chain, WriteRejection, CHUNK_CAPACITY};
pub use error::{BatchWriteOutcome, ReadError, WriteError};
pub use path::{MetricPath, ScopeSegment};
pub use registry::{MetricId, MetricRegistry};
pub use scope::{Scope, UnknownScope};
pub use stats::{JobData, JobMetric, Series, StatisticsSeries};
pub use store::{Health, MetricStore, Sample, MAX_MISSING, MAX_UNHEALTHY};
