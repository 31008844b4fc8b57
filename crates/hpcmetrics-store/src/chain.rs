// SPDX-License-Identifier: Apache-2.0

//! Ring-buffer chains: the fixed-capacity, singly linked chunks a metric's samples live in.

/// Samples per chunk before a new one is allocated. Chosen so a chunk covers a reasonable
/// interval at typical HPC sampling frequencies without becoming a memory-accounting nuisance.
pub const CHUNK_CAPACITY: usize = 512;

/// Extra empty slots tolerated at the head of a chunk before it is considered full, allowing a
/// slightly early sample to still land in the current chunk rather than force a reallocation.
const SLACK: i64 = 2;

/// One fixed-capacity segment of a chain: a contiguous run of samples at a single frequency.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Timestamp (unix seconds) of `data[0]`.
    pub start: i64,
    /// Seconds between samples.
    pub frequency: u32,
    /// Sample values; `NAN` marks a slot that has not been written yet.
    pub data: Vec<f32>,
    /// Whether this chunk will never accept further writes (superseded by a newer one).
    pub closed: bool,
}

impl Chunk {
    fn new(start: i64, frequency: u32) -> Self {
        Chunk {
            start,
            frequency,
            data: Vec::with_capacity(CHUNK_CAPACITY),
            closed: false,
        }
    }

    /// Exclusive end timestamp: one frequency step past the last occupied slot.
    #[must_use]
    pub fn end(&self) -> i64 {
        self.start + i64::from(self.frequency) * self.data.len() as i64
    }

    fn offset_for(&self, timestamp: i64) -> Option<i64> {
        if self.frequency == 0 {
            return None;
        }
        let delta = timestamp - self.start;
        if delta % i64::from(self.frequency) != 0 {
            return None;
        }
        Some(delta / i64::from(self.frequency))
    }
}

/// Why a sample could not be written into a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WriteRejection {
    /// The sample's timestamp lies before the start of the current head chunk.
    #[error("sample out of order")]
    OutOfOrder,
}

/// A singly linked sequence of chunks for one metric at one Level, most recent first.
#[derive(Debug, Default)]
pub struct Chain {
    /// Chunks ordered newest-first; `chunks[0]` is the current write head when non-empty.
    chunks: Vec<Chunk>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Chain { chunks: Vec::new() }
    }

    /// Appends a sample at `timestamp`, allocating a new chunk if the current head is full or the
    /// timestamp falls beyond its addressable range.
    pub fn write(&mut self, timestamp: i64, frequency: u32, value: f32) -> Result<(), WriteRejection> {
        if let Some(head) = self.chunks.first_mut() {
            if timestamp < head.start {
                return Err(WriteRejection::OutOfOrder);
            }
            if let Some(offset) = head.offset_for(timestamp) {
                let max_addressable = head.data.len() as i64 + SLACK;
                if offset < max_addressable && !head.closed {
                    let idx = offset as usize;
                    if idx >= head.data.len() {
                        head.data.resize(idx + 1, f32::NAN);
                    }
                    head.data[idx] = value;
                    return Ok(());
                }
            }
            head.closed = true;
        }
        let mut chunk = Chunk::new(timestamp, frequency);
        chunk.data.push(value);
        self.chunks.insert(0, chunk);
        Ok(())
    }

    /// Returns the ordered series of `(timestamp, value)` pairs intersecting `[from, to)`, along
    /// with the frequency in effect. Chains spanning a frequency change report the frequency of
    /// the newest intersecting chunk.
    #[must_use]
    pub fn read(&self, from: i64, to: i64) -> Option<(u32, Vec<(i64, f32)>)> {
        let mut frequency = None;
        let mut out = Vec::new();
        for chunk in &self.chunks {
            if chunk.end() < from {
                break;
            }
            if chunk.start >= to {
                continue;
            }
            if frequency.is_none() {
                frequency = Some(chunk.frequency);
            }
            let mut segment: Vec<(i64, f32)> = chunk
                .data
                .iter()
                .enumerate()
                .map(|(i, v)| (chunk.start + i64::from(chunk.frequency) * i as i64, *v))
                .filter(|(ts, _)| *ts >= from && *ts < to)
                .collect();
            segment.extend(out);
            out = segment;
        }
        frequency.map(|f| (f, out))
    }

    /// Timestamp of the newest chunk's end, if any data has been written.
    #[must_use]
    pub fn last_end(&self) -> Option<i64> {
        self.chunks.first().map(Chunk::end)
    }

    /// Drops chunks entirely older than `cutoff` (end timestamp ≤ cutoff), returning the number
    /// of samples freed.
    pub fn evict_before(&mut self, cutoff: i64) -> usize {
        let mut freed = 0;
        self.chunks.retain(|c| {
            let keep = c.end() > cutoff;
            if !keep {
                freed += c.data.len();
            }
            keep
        });
        freed
    }

    /// Total number of samples resident across all chunks.
    #[must_use]
    pub fn resident_samples(&self) -> usize {
        self.chunks.iter().map(|c| c.data.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_writes_stay_in_one_chunk() {
        let mut chain = Chain::new();
        for i in 0..10 {
            chain.write(i * 10, 10, i as f32).unwrap();
        }
        assert_eq!(chain.chunks.len(), 1);
        let (freq, series) = chain.read(0, 100).unwrap();
        assert_eq!(freq, 10);
        assert_eq!(series.len(), 10);
    }

    #[test]
    fn out_of_order_write_is_rejected() {
        let mut chain = Chain::new();
        chain.write(100, 10, 1.0).unwrap();
        chain.write(110, 10, 2.0).unwrap();
        let err = chain.write(50, 10, 3.0).unwrap_err();
        assert_eq!(err, WriteRejection::OutOfOrder);
    }

    #[test]
    fn far_future_write_allocates_new_chunk() {
        let mut chain = Chain::new();
        chain.write(0, 10, 1.0).unwrap();
        chain.write(10_000, 10, 2.0).unwrap();
        assert_eq!(chain.chunks.len(), 2);
        let (_, series) = chain.read(0, 10_010).unwrap();
        assert_eq!(series.first().copied(), Some((0, 1.0)));
        assert_eq!(series.last().copied(), Some((10_000, 2.0)));
    }

    #[test]
    fn evict_before_frees_only_old_chunks() {
        let mut chain = Chain::new();
        chain.write(0, 10, 1.0).unwrap();
        chain.write(10_000, 10, 2.0).unwrap();
        let freed = chain.evict_before(5_000);
        assert_eq!(freed, 1);
        assert_eq!(chain.resident_samples(), 1);
    }
}
