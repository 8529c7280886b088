//! Error taxonomy for the batch-preparation pipeline.
//!
//! Every failure here is a deterministic consequence of configuration or
//! input data: there are no retryable errors in this core, and nothing is
//! swallowed. An empty dataset is not an error at all — the pipeline logs a
//! warning and yields zero batches.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid option value or option combination. Raised eagerly, before
    /// any batch is produced.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A probing sentence split into sub-words. Probing corpora must
    /// tokenize one-token-per-word; a mismatch means the tokenizer and the
    /// corpus are incompatible, which no retry can fix.
    #[error("probing sequence splits into sub-words: {sequence:?} -> {tokens:?}")]
    TokenizationMismatch {
        sequence: String,
        tokens: Vec<String>,
    },

    /// The token dimension of an encoded batch exceeds the configured
    /// maximum — a truncation/configuration inconsistency upstream.
    #[error("batch token dimension ({got}) exceeds max_num_tokens_in_sequence ({max})")]
    Shape { got: usize, max: usize },

    /// Failure inside the tokenizer library (its error type is not `Sync`,
    /// so it is carried as a string).
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
