//! Pipeline configuration.
//!
//! Serialised as JSON. Every field has a default so a minimal `{}` produces
//! a working training configuration. Probing runs use the fixed
//! [`PipelineParams::probing`] variant instead of a JSON file.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

// ── Mode ────────────────────────────────────────────────────────────────────

/// Selects how mask patterns come into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Patterns are generated (combinatorially or probabilistically).
    #[default]
    Training,
    /// Patterns are read off mask-symbol markers in the input text;
    /// the generator is bypassed.
    Probing,
}

// ── Mask probability ────────────────────────────────────────────────────────

/// Per-token inclusion probability for probabilistic masking.
///
/// Serialises as the string `"auto"` (probability becomes
/// `mask_pattern_size / num_tokens` per sequence) or as a float in (0, 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaskProbability {
    Auto,
    Fixed(f64),
}

impl Serialize for MaskProbability {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MaskProbability::Auto => serializer.serialize_str("auto"),
            MaskProbability::Fixed(p) => serializer.serialize_f64(*p),
        }
    }
}

impl<'de> Deserialize<'de> for MaskProbability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(f64),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(p) => Ok(MaskProbability::Fixed(p)),
            Raw::Str(s) if s == "auto" => Ok(MaskProbability::Auto),
            Raw::Str(s) => Err(serde::de::Error::custom(format!(
                "mask_probability must be \"auto\" or a float, got {s:?}"
            ))),
        }
    }
}

// ── Params ──────────────────────────────────────────────────────────────────

/// Everything the batch-preparation pipeline needs to know.
///
/// Backwards-compatible: missing JSON fields fall back to their
/// `#[serde(default)]` values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Maximum tokens per sequence, including the BOS/EOS symbols.
    #[serde(default = "default_max_num_tokens")]
    pub max_num_tokens_in_sequence: usize,
    /// Curriculum start value for the leave-unmasked probability.
    #[serde(default)]
    pub leave_unmasked_prob_start: f64,
    /// Curriculum target value, reached at the final batch.
    #[serde(default)]
    pub leave_unmasked_prob: f64,
    /// Probability that a masked position gets a random vocabulary token
    /// instead of the mask symbol.
    #[serde(default)]
    pub random_token_prob: f64,
    /// Keep all mask-pattern variants of one sequence adjacent, preserving
    /// corpus order. Disable only when training order does not matter.
    #[serde(default = "default_true")]
    pub consecutive_masking: bool,
    /// Number of token indices per generated mask pattern.
    #[serde(default = "default_mask_pattern_size")]
    pub mask_pattern_size: usize,
    /// Number of mask patterns requested per sequence.
    #[serde(default = "default_num_mask_patterns")]
    pub num_mask_patterns: usize,
    /// Draw patterns by independent per-token inclusion instead of sampling
    /// fixed-size index subsets.
    #[serde(default)]
    pub probabilistic_masking: bool,
    /// Per-token inclusion probability for probabilistic masking.
    #[serde(default = "default_mask_probability")]
    pub mask_probability: MaskProbability,
    /// Truncate over-long sequences instead of excluding them.
    #[serde(default)]
    pub allow_truncated_sentences: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Draw batches as random contiguous slices instead of walking the
    /// record list once.
    #[serde(default)]
    pub sample_with_replacement: bool,
    /// Number of leading vocabulary ids (pad, unk, bos, eos, mask, ...)
    /// excluded from random-token replacement. Tokenizer-specific.
    #[serde(default = "default_num_reserved_token_ids")]
    pub num_reserved_token_ids: usize,
    #[serde(default)]
    pub mode: PipelineMode,
}

fn default_max_num_tokens() -> usize {
    128
}
fn default_true() -> bool {
    true
}
fn default_mask_pattern_size() -> usize {
    2
}
fn default_num_mask_patterns() -> usize {
    10
}
fn default_mask_probability() -> MaskProbability {
    MaskProbability::Auto
}
fn default_batch_size() -> usize {
    16
}
fn default_num_reserved_token_ids() -> usize {
    6
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            max_num_tokens_in_sequence: default_max_num_tokens(),
            leave_unmasked_prob_start: 0.0,
            leave_unmasked_prob: 0.0,
            random_token_prob: 0.0,
            consecutive_masking: true,
            mask_pattern_size: default_mask_pattern_size(),
            num_mask_patterns: default_num_mask_patterns(),
            probabilistic_masking: false,
            mask_probability: MaskProbability::Auto,
            allow_truncated_sentences: false,
            batch_size: default_batch_size(),
            sample_with_replacement: false,
            num_reserved_token_ids: default_num_reserved_token_ids(),
            mode: PipelineMode::Training,
        }
    }
}

impl PipelineParams {
    /// The fixed probing configuration: no generated patterns, no curriculum,
    /// no random replacement, no truncation, batches of 32 up to 256 tokens.
    pub fn probing() -> Self {
        Self {
            max_num_tokens_in_sequence: 256,
            leave_unmasked_prob_start: 0.0,
            leave_unmasked_prob: 0.0,
            random_token_prob: 0.0,
            consecutive_masking: true,
            mask_pattern_size: 0,
            num_mask_patterns: 0,
            probabilistic_masking: false,
            mask_probability: MaskProbability::Auto,
            allow_truncated_sentences: false,
            batch_size: 32,
            sample_with_replacement: false,
            num_reserved_token_ids: default_num_reserved_token_ids(),
            mode: PipelineMode::Probing,
        }
    }

    /// Check every option eagerly, before any batch is produced.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.leave_unmasked_prob_start) {
            return Err(Error::Configuration(format!(
                "leave_unmasked_prob_start must be in [0, 1), got {}",
                self.leave_unmasked_prob_start
            )));
        }
        if self.leave_unmasked_prob < self.leave_unmasked_prob_start
            || self.leave_unmasked_prob > 1.0
        {
            return Err(Error::Configuration(format!(
                "leave_unmasked_prob must be in [leave_unmasked_prob_start, 1], got {}",
                self.leave_unmasked_prob
            )));
        }
        if !(0.0..=1.0).contains(&self.random_token_prob) {
            return Err(Error::Configuration(format!(
                "random_token_prob must be in [0, 1], got {}",
                self.random_token_prob
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::Configuration("batch_size must be positive".into()));
        }
        if self.max_num_tokens_in_sequence <= 2 {
            return Err(Error::Configuration(
                "max_num_tokens_in_sequence must leave room for BOS and EOS".into(),
            ));
        }
        if self.mode == PipelineMode::Training {
            if self.mask_pattern_size == 0 {
                return Err(Error::Configuration(
                    "mask_pattern_size must be positive".into(),
                ));
            }
            if self.num_mask_patterns == 0 {
                return Err(Error::Configuration(
                    "num_mask_patterns must be positive".into(),
                ));
            }
            if self.probabilistic_masking {
                if let MaskProbability::Fixed(p) = self.mask_probability {
                    if !(p > 0.0 && p < 1.0) {
                        return Err(Error::Configuration(format!(
                            "mask_probability must be \"auto\" or in (0, 1), got {p}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Save params to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Configuration(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load params from a JSON file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let params: Self =
            serde_json::from_str(&json).map_err(|e| Error::Configuration(e.to_string()))?;
        Ok(params)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
