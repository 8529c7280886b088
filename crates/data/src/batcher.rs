//! Batch assembly: record ordering and chunk planning.
//!
//! Batches are contiguous slices of the record list. Without replacement
//! the slices walk the list once; with replacement the slice starts are
//! drawn uniformly at random, `num_records / batch_size` of them per epoch.

use std::ops::Range;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffle the record list when consecutive masking is off. With it on,
/// every pattern variant of one sequence stays adjacent and corpus order is
/// preserved — required when training follows corpus order.
pub fn order_records<T>(records: &mut [T], consecutive_masking: bool, rng: &mut StdRng) {
    if !consecutive_masking {
        tracing::warn!("consecutive masking disabled; training data order is discarded");
        records.shuffle(rng);
    }
}

/// Plan the slice ranges for one epoch.
pub fn chunk_ranges(
    num_records: usize,
    batch_size: usize,
    sample_with_replacement: bool,
    rng: &mut StdRng,
) -> Vec<Range<usize>> {
    if num_records == 0 {
        return Vec::new();
    }
    if sample_with_replacement {
        // Random contiguous slices, not random individual records. The
        // upper bound collapses to 1 when the dataset fits in one batch.
        let upper = num_records.saturating_sub(batch_size).max(1);
        (0..num_records / batch_size)
            .map(|_| {
                let start = rng.random_range(0..upper);
                start..(start + batch_size).min(num_records)
            })
            .collect()
    } else {
        (0..num_records)
            .step_by(batch_size)
            .map(|start| start..(start + batch_size).min(num_records))
            .collect()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
