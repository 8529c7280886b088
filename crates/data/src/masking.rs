//! Mask/replace engine.
//!
//! Turns one batch's encodings and mask patterns into model-ready tensors.
//! Split in two: [`MaskPlan`] decides, per position, which of
//! mask-symbol-insertion / leave-unmasked / random-replacement applies;
//! [`mask_batch`] applies the plan and converts the flat row-major buffers
//! to Candle tensors.

use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::Rng;

use masklm_common::{Error, PipelineParams, Result};

use crate::encoder::Encoded;
use crate::patterns::MaskPattern;

/// Boolean matrices (flat, row-major) classifying every batch position.
///
/// Invariants: `unmask`, `rand_mask` and `insertion` are only ever true
/// where `mask` is true; `unmask` and `rand_mask` never overlap;
/// `insertion = mask XOR unmask`.
#[derive(Debug, Clone)]
pub struct MaskPlan {
    pub rows: usize,
    pub cols: usize,
    /// Supervision targets: true at every pattern index (+1 for BOS).
    pub mask: Vec<bool>,
    /// Selected positions that keep their original token.
    pub unmask: Option<Vec<bool>>,
    /// Selected positions that get a random vocabulary token.
    pub rand_mask: Option<Vec<bool>>,
    /// Positions that actually receive the mask symbol.
    pub insertion: Vec<bool>,
}

impl MaskPlan {
    /// Build the plan for one batch.
    ///
    /// Draws from `rng` only when `random_token_prob + leave_unmasked_prob`
    /// is positive; with both zero the plan is fully deterministic.
    pub fn build(
        rows: usize,
        cols: usize,
        patterns: &[MaskPattern],
        leave_unmasked_prob: f64,
        random_token_prob: f64,
        rng: &mut StdRng,
    ) -> Self {
        debug_assert_eq!(rows, patterns.len());

        let mut mask = vec![false; rows * cols];
        for (row, pattern) in patterns.iter().enumerate() {
            for &index in pattern {
                // +1 skips the BOS symbol prepended at batch-encode time
                mask[row * cols + index + 1] = true;
            }
        }

        let rand_or_unmask_prob = random_token_prob + leave_unmasked_prob;
        let (unmask, rand_mask) = if rand_or_unmask_prob > 0.0 {
            let rand_or_unmask: Vec<bool> = mask
                .iter()
                .map(|&m| m && rng.random::<f64>() < rand_or_unmask_prob)
                .collect();
            if random_token_prob == 0.0 {
                (Some(rand_or_unmask), None)
            } else if leave_unmasked_prob == 0.0 {
                (None, Some(rand_or_unmask))
            } else {
                // Both nonzero: split each selected position proportionally
                // with a second independent draw.
                let unmask_prob = leave_unmasked_prob / rand_or_unmask_prob;
                let mut unmask = vec![false; rows * cols];
                let mut rand_mask = vec![false; rows * cols];
                for (i, &selected) in rand_or_unmask.iter().enumerate() {
                    if selected {
                        if rng.random::<f64>() < unmask_prob {
                            unmask[i] = true;
                        } else {
                            rand_mask[i] = true;
                        }
                    }
                }
                (Some(unmask), Some(rand_mask))
            }
        } else {
            (None, None)
        };

        let insertion = match &unmask {
            Some(unmask) => mask.iter().zip(unmask).map(|(&m, &u)| m ^ u).collect(),
            None => mask.clone(),
        };

        Self {
            rows,
            cols,
            mask,
            unmask,
            rand_mask,
            insertion,
        }
    }
}

/// One vectorized batch: everything the training/probing loop consumes.
///
/// `input_ids` and `attention_mask` are U32 of shape `(batch, seq)`;
/// `mask` is U8 of the same shape; `labels` is U32 rank-1, the original ids
/// at masked positions in row-major order, or `None` when the batch carries
/// no mask patterns at all (forced-choice probing).
#[derive(Debug)]
pub struct MaskedBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub labels: Option<Tensor>,
    pub mask: Tensor,
}

/// Apply masking to one encoded batch.
///
/// Replacement ids are drawn uniformly from the vocabulary with the first
/// `num_reserved_token_ids` ids excluded.
#[allow(clippy::too_many_arguments)]
pub fn mask_batch(
    encodings: &[Encoded],
    patterns: &[MaskPattern],
    leave_unmasked_prob: f64,
    params: &PipelineParams,
    mask_symbol_id: u32,
    vocab_size: usize,
    rng: &mut StdRng,
    device: &Device,
) -> Result<MaskedBatch> {
    let rows = encodings.len();
    let cols = encodings.first().map(Encoded::len).unwrap_or(0);
    if cols > params.max_num_tokens_in_sequence {
        return Err(Error::Shape {
            got: cols,
            max: params.max_num_tokens_in_sequence,
        });
    }

    let mut raw_ids = Vec::with_capacity(rows * cols);
    let mut attention = Vec::with_capacity(rows * cols);
    for encoding in encodings {
        raw_ids.extend_from_slice(&encoding.ids);
        attention.extend_from_slice(&encoding.attention_mask);
    }

    let plan = MaskPlan::build(
        rows,
        cols,
        patterns,
        leave_unmasked_prob,
        params.random_token_prob,
        rng,
    );

    let mut input_ids = raw_ids.clone();
    for (i, &insert) in plan.insertion.iter().enumerate() {
        if insert {
            input_ids[i] = mask_symbol_id;
        }
    }
    if let Some(rand_mask) = &plan.rand_mask {
        let lowest = params.num_reserved_token_ids as u32;
        for (i, &replace) in rand_mask.iter().enumerate() {
            if replace {
                input_ids[i] = rng.random_range(lowest..vocab_size as u32);
            }
        }
    }

    let labels = if patterns.iter().all(|p| p.is_empty()) {
        // Forced-choice probing: nothing to predict.
        None
    } else {
        let targets: Vec<u32> = plan
            .mask
            .iter()
            .enumerate()
            .filter(|&(_, &m)| m)
            .map(|(i, _)| raw_ids[i])
            .collect();
        let num_targets = targets.len();
        Some(Tensor::from_vec(targets, num_targets, device)?)
    };

    let mask_u8: Vec<u8> = plan.mask.iter().map(|&m| m as u8).collect();
    Ok(MaskedBatch {
        input_ids: Tensor::from_vec(input_ids, (rows, cols), device)?,
        attention_mask: Tensor::from_vec(attention, (rows, cols), device)?,
        labels,
        mask: Tensor::from_vec(mask_u8, (rows, cols), device)?,
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────
