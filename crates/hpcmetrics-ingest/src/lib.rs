// SPDX-License-Identifier: Apache-2.0

//! Line-protocol parsing and the batch write endpoint metric producers push samples through.

mod batch;
mod line;

pub use batch::{write_batch, BatchResult, IngestState};
pub use line::{parse_line, LineError, ParsedSample};
