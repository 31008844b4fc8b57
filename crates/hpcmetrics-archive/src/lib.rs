// SPDX-License-Identifier: Apache-2.0

//! Archive backends for completed jobs.
//!
//! Three storage variants share one capability set ([`ArchiveBackend`]): a local filesystem tree
//! and a remote object store are unified behind a single `object_store::ObjectStore`
//! implementation ([`ObjectStoreBackend`]); an embedded key-value variant ([`SledBackend`]) is a
//! distinct implementation over `sled`. Both address entries with the same content-addressed path
//! scheme (see [`path`]).

mod backend;
mod entry;
mod error;
mod kv_backend;
mod meta;
mod null_backend;
mod object_store_backend;
pub mod path;
pub mod subcluster;
pub mod topology;

pub use backend::{ArchiveBackend, ArchiveInfo, CleanRange, IterOptions, CLEAN_MAX_SCAN};
pub use entry::ArchiveEntry;
pub use error::{ArchiveError, ArchiveErrorKind};
pub use kv_backend::SledBackend;
pub use meta::{JobMeta, MonitoringStatus};
pub use null_backend::NullBackend;
pub use object_store_backend::{local_filesystem, ObjectStoreBackend};
pub use topology::{ClusterTopology, MetricThresholds, MetricTopology, SubCluster};
