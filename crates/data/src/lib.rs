//! # masklm-data — MLM batch preparation
//!
//! Turns a plain-text corpus into the tensors a masked-language-model
//! encoder trains (or probes) on: input ids, attention mask, masked-position
//! matrix, target ids. The pipeline is pull-based and single-threaded:
//!
//! corpus → [`filter`] → [`patterns`] → records → [`batcher`] →
//! batch encode → [`masking`] → `(x, y, mask)`
//!
//! * **[`MlmDataset`]** — the assembled pipeline; call [`MlmDataset::next_batch`].
//! * **[`TokenEncoder`]** / **[`HfTokenizer`]** — narrow tokenizer seam.
//! * **[`Curriculum`]** — per-batch leave-unmasked probability ramp.
//! * **[`MaskPlan`]** / **[`MaskedBatch`]** — the mask/replace engine.

pub mod batcher;
pub mod corpus;
pub mod curriculum;
pub mod dataset;
pub mod encoder;
pub mod filter;
pub mod masking;
pub mod patterns;

#[cfg(test)]
pub(crate) mod test_util;

pub use curriculum::Curriculum;
pub use dataset::{DataRecord, MlmDataset};
pub use encoder::{Encoded, HfTokenizer, TokenEncoder, MASK_SYMBOL, PAD_SYMBOL};
pub use filter::{filter_sequences, FilterOutcome};
pub use masking::{mask_batch, MaskPlan, MaskedBatch};
pub use patterns::MaskPattern;
