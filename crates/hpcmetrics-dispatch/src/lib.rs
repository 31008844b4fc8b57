// SPDX-License-Identifier: Apache-2.0

//! The metric dispatcher: routes job and node reads between the live store and the archive,
//! resamples archived series, derives summary statistics, and caches results.

mod cache_key;
mod dispatcher;
mod error;
mod job;
mod lttb;

pub use cache_key::{DispatchKey, COMPLETED_TTL, RUNNING_TTL};
pub use dispatcher::{JobStat, MetricDispatcher};
pub use error::DispatchError;
pub use job::JobRef;
