//! Sampling schedules: ordered batches of dataset indices.

use std::ops::Range;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{QclError, QclResult};

/// Ordered batches of sample indices into a fixed dataset.
///
/// Indices may repeat; each occurrence is evaluated separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingSchedule {
    batches: Vec<Vec<usize>>,
}

impl SamplingSchedule {
    /// One batch holding every index `0..len`.
    pub fn whole(len: usize) -> Self {
        Self {
            batches: vec![(0..len).collect()],
        }
    }

    /// Use explicit batches.
    pub fn from_batches(batches: Vec<Vec<usize>>) -> Self {
        Self { batches }
    }

    /// One batch per range.
    pub fn from_ranges(ranges: impl IntoIterator<Item = Range<usize>>) -> Self {
        Self {
            batches: ranges.into_iter().map(Iterator::collect).collect(),
        }
    }

    /// Consecutive batches of at most `size` indices covering `0..len`.
    pub fn chunked(len: usize, size: usize) -> Self {
        let size = size.max(1);
        Self::from_ranges((0..len).step_by(size).map(|start| start..(start + size).min(len)))
    }

    /// Like [`Self::chunked`] over a seeded permutation of `0..len`.
    pub fn shuffled(len: usize, size: usize, seed: u64) -> Self {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        Self {
            batches: order.chunks(size.max(1)).map(<[usize]>::to_vec).collect(),
        }
    }

    /// Batches in order.
    pub fn batches(&self) -> &[Vec<usize>] {
        &self.batches
    }

    /// Total number of index occurrences.
    pub fn len(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Whether the schedule enumerates nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every index occurrence, batch by batch.
    pub fn iter_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.batches.iter().flatten().copied()
    }

    /// All occurrences flattened into one batch.
    pub fn flattened(&self) -> Vec<usize> {
        self.iter_indices().collect()
    }

    /// Fail on the first index that does not address a sample.
    pub fn check_range(&self, len: usize) -> QclResult<()> {
        match self.iter_indices().find(|&i| i >= len) {
            Some(index) => Err(QclError::ScheduleRange { index, len }),
            None => Ok(()),
        }
    }
}
