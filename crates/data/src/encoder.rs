//! Tokenizer adapter.
//!
//! The pipeline consumes tokenization through the narrow [`TokenEncoder`]
//! trait: raw (no special symbols) encoding for length counting and probing
//! markers, padded batch encoding for vectorization, and symbol lookups.
//! [`HfTokenizer`] adapts a `tokenizers::Tokenizer`; tests substitute an
//! in-memory whitespace vocabulary.

use std::path::Path;

use tokenizers::processors::template::TemplateProcessing;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

use masklm_common::{Error, Result};

pub const MASK_SYMBOL: &str = "<mask>";
pub const PAD_SYMBOL: &str = "<pad>";
pub const BOS_SYMBOL: &str = "<s>";
pub const EOS_SYMBOL: &str = "</s>";

/// One encoded sequence: parallel ids / token strings / attention positions.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub ids: Vec<u32>,
    pub tokens: Vec<String>,
    pub attention_mask: Vec<u32>,
}

impl Encoded {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// What the pipeline needs from a tokenizer, and nothing more.
pub trait TokenEncoder {
    /// Encode one sequence without special symbols.
    fn encode(&self, text: &str) -> Result<Encoded>;
    /// Encode a batch with special symbols and padding; all returned
    /// encodings have equal length.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Encoded>>;
    fn token_to_id(&self, symbol: &str) -> Option<u32>;
    fn vocab_size(&self) -> usize;

    /// Like [`token_to_id`](Self::token_to_id) but a missing symbol is a
    /// configuration error.
    fn symbol_id(&self, symbol: &str) -> Result<u32> {
        self.token_to_id(symbol)
            .ok_or_else(|| Error::Configuration(format!("tokenizer has no {symbol} symbol")))
    }
}

// ── HuggingFace tokenizer adapter ───────────────────────────────────────────

/// Adapter around `tokenizers::Tokenizer`.
pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    pub fn new(inner: Tokenizer) -> Self {
        Self { inner }
    }

    /// Load a tokenizer file and configure it for the pipeline: a
    /// `<s> $A </s>` template, padding with the pad symbol, truncation at
    /// `max_num_tokens_in_sequence`.
    pub fn from_file(path: &Path, max_num_tokens_in_sequence: usize) -> Result<Self> {
        let mut tokenizer =
            Tokenizer::from_file(path).map_err(|e| Error::Tokenizer(e.to_string()))?;

        let bos = tokenizer
            .token_to_id(BOS_SYMBOL)
            .ok_or_else(|| Error::Configuration(format!("tokenizer has no {BOS_SYMBOL} symbol")))?;
        let eos = tokenizer
            .token_to_id(EOS_SYMBOL)
            .ok_or_else(|| Error::Configuration(format!("tokenizer has no {EOS_SYMBOL} symbol")))?;
        let pad = tokenizer
            .token_to_id(PAD_SYMBOL)
            .ok_or_else(|| Error::Configuration(format!("tokenizer has no {PAD_SYMBOL} symbol")))?;

        let mut builder = TemplateProcessing::builder();
        builder
            .try_single(format!("{BOS_SYMBOL} $A {EOS_SYMBOL}"))
            .map_err(Error::Tokenizer)?;
        builder.special_tokens(vec![(BOS_SYMBOL, bos), (EOS_SYMBOL, eos)]);
        let template = builder
            .build()
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        tokenizer.with_post_processor(Some(template));

        tokenizer.with_padding(Some(PaddingParams {
            pad_id: pad,
            pad_token: PAD_SYMBOL.to_string(),
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_num_tokens_in_sequence,
                ..Default::default()
            }))
            .map_err(|e| Error::Tokenizer(e.to_string()))?;

        Ok(Self { inner: tokenizer })
    }
}

impl TokenEncoder for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Encoded> {
        let enc = self
            .inner
            .encode(text, false)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(Encoded {
            ids: enc.get_ids().to_vec(),
            tokens: enc.get_tokens().to_vec(),
            attention_mask: enc.get_attention_mask().to_vec(),
        })
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Encoded>> {
        let encodings = self
            .inner
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(encodings
            .into_iter()
            .map(|enc| Encoded {
                ids: enc.get_ids().to_vec(),
                tokens: enc.get_tokens().to_vec(),
                attention_mask: enc.get_attention_mask().to_vec(),
            })
            .collect())
    }

    fn token_to_id(&self, symbol: &str) -> Option<u32> {
        self.inner.token_to_id(symbol)
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}
