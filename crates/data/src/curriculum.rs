//! Unmasking curriculum: a linear ramp of leave-unmasked probabilities,
//! one value per batch.
//!
//! The ramp is precomputed at dataset construction; the mask/replace engine
//! consumes exactly one value per batch in order. Running out early, or
//! finishing an epoch with values left over, means the batch count was
//! miscalculated — a programming error surfaced as a fatal
//! `Error::Configuration`, never papered over.

use masklm_common::{Error, Result};

/// Lazily advancing cursor over the precomputed ramp.
#[derive(Debug, Clone)]
pub struct Curriculum {
    values: Vec<f64>,
    cursor: usize,
}

impl Curriculum {
    /// Evenly spaced values from `start` to `target` inclusive;
    /// `num_batches == 1` yields just `start`.
    pub fn new(start: f64, target: f64, num_batches: usize) -> Self {
        Self {
            values: linspace(start, target, num_batches),
            cursor: 0,
        }
    }

    /// The leave-unmasked probability for the next batch.
    pub fn next_prob(&mut self) -> Result<f64> {
        let value = self.values.get(self.cursor).copied().ok_or_else(|| {
            Error::Configuration(format!(
                "curriculum exhausted after {} batches; batch count was miscalculated",
                self.values.len()
            ))
        })?;
        self.cursor += 1;
        Ok(value)
    }

    /// Rewind for a fresh epoch.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.values.len() - self.cursor
    }
}

/// Number of batches one epoch produces.
///
/// Without replacement this is the chunk count (final chunk may be short).
/// With replacement the original formula `num_records / batch_size` is kept
/// even though it can slightly undercount the chunked path — changing it
/// would change training semantics.
pub fn num_batches(num_records: usize, batch_size: usize, sample_with_replacement: bool) -> usize {
    if sample_with_replacement {
        num_records / batch_size
    } else {
        num_records.div_ceil(batch_size)
    }
}

fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..num)
            .map(|i| start + i as f64 * (stop - start) / (num - 1) as f64)
            .collect(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
