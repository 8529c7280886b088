//! Sequence filter: tokenized lengths, truncation, exclusion.
//!
//! Runs once per dataset, before any mask pattern exists. Deterministic:
//! the same corpus and params always produce the same outcome.

use indicatif::ProgressBar;

use masklm_common::{Error, PipelineMode, PipelineParams, Result};

use crate::encoder::TokenEncoder;

/// Retained sequences with their post-truncation token counts, parallel by
/// index.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub sequences: Vec<String>,
    pub token_counts: Vec<usize>,
    pub num_excluded: usize,
}

/// Tokenize every sequence, drop the over-long ones (unless truncation is
/// allowed) and record each survivor's usable token count.
///
/// The count leaves room for the BOS/EOS symbols: a survivor keeps
/// `min(max_len - 2, n)` tokens, so no mask index can land in the overflow
/// region. In probing mode a sequence whose sub-word count differs from its
/// whitespace word count is fatal — probing corpora must not split.
pub fn filter_sequences<E: TokenEncoder>(
    sequences: &[String],
    encoder: &E,
    params: &PipelineParams,
) -> Result<FilterOutcome> {
    let max_len = params.max_num_tokens_in_sequence;

    let mut retained = Vec::new();
    let mut token_counts = Vec::new();
    let mut num_excluded = 0usize;
    let mut num_tokens_total = 0usize;

    let bar = ProgressBar::new(sequences.len() as u64);
    for s in sequences {
        let enc = encoder.encode(s)?;
        let n = enc.len();
        bar.inc(1);

        if params.mode == PipelineMode::Probing && n != s.split_whitespace().count() {
            bar.finish_and_clear();
            return Err(Error::TokenizationMismatch {
                sequence: s.clone(),
                tokens: enc.tokens,
            });
        }

        // +2 for the BOS/EOS symbols added at batch-encode time
        if !params.allow_truncated_sentences && n + 2 > max_len {
            num_excluded += 1;
            continue;
        }

        num_tokens_total += n;
        token_counts.push((max_len - 2).min(n));
        retained.push(s.clone());
    }
    bar.finish_and_clear();

    if params.allow_truncated_sentences {
        tracing::info!("truncation allowed; no sequences excluded");
    } else {
        tracing::info!(num_excluded, max_len, "excluded over-long sequences");
    }
    if retained.is_empty() {
        tracing::warn!("no sequences survived filtering; pipeline will yield zero batches");
    } else {
        let mean = num_tokens_total as f64 / retained.len() as f64;
        tracing::info!(mean_tokens = format!("{mean:.2}"), "tokenized sequence lengths");
    }

    Ok(FilterOutcome {
        sequences: retained,
        token_counts,
        num_excluded,
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::WordVocab;
    use masklm_common::PipelineParams;

    fn corpus() -> Vec<String> {
        vec![
            "the cat sat".to_string(),
            "a dog ran very fast today".to_string(),
        ]
    }

    fn params(max_len: usize, allow_truncated: bool) -> PipelineParams {
        PipelineParams {
            max_num_tokens_in_sequence: max_len,
            allow_truncated_sentences: allow_truncated,
            ..Default::default()
        }
    }

    #[test]
    fn boundary_sequence_is_retained_untruncated() {
        let sequences = corpus();
        let vocab = WordVocab::new(&sequences);
        // "the cat sat" has 3 tokens; max_len 5 leaves exactly 3 after BOS/EOS
        let outcome = filter_sequences(&sequences, &vocab, &params(5, false)).unwrap();
        assert_eq!(outcome.sequences, vec!["the cat sat".to_string()]);
        assert_eq!(outcome.token_counts, vec![3]);
        assert_eq!(outcome.num_excluded, 1);
    }

    #[test]
    fn one_token_longer_is_excluded_or_truncated() {
        let sequences = vec!["a b c d".to_string()];
        let vocab = WordVocab::new(&sequences);

        let outcome = filter_sequences(&sequences, &vocab, &params(5, false)).unwrap();
        assert!(outcome.sequences.is_empty());
        assert_eq!(outcome.num_excluded, 1);

        let outcome = filter_sequences(&sequences, &vocab, &params(5, true)).unwrap();
        assert_eq!(outcome.sequences.len(), 1);
        assert_eq!(outcome.token_counts, vec![3]); // max_len - 2
        assert_eq!(outcome.num_excluded, 0);
    }

    #[test]
    fn filter_is_idempotent() {
        let sequences = corpus();
        let vocab = WordVocab::new(&sequences);
        let a = filter_sequences(&sequences, &vocab, &params(6, false)).unwrap();
        let b = filter_sequences(&sequences, &vocab, &params(6, false)).unwrap();
        assert_eq!(a.sequences, b.sequences);
        assert_eq!(a.token_counts, b.token_counts);
    }

    #[test]
    fn probing_rejects_subword_splits() {
        let sequences = vec!["the cat was running".to_string()];
        let vocab = WordVocab::new(&sequences).with_subword_splits();
        let params = PipelineParams::probing();
        let err = filter_sequences(&sequences, &vocab, &params).unwrap_err();
        assert!(matches!(
            err,
            masklm_common::Error::TokenizationMismatch { .. }
        ));
    }

    #[test]
    fn empty_corpus_survives_as_empty_outcome() {
        let vocab = WordVocab::new(&[]);
        let outcome = filter_sequences(&[], &vocab, &params(10, false)).unwrap();
        assert!(outcome.sequences.is_empty());
        assert_eq!(outcome.num_excluded, 0);
    }
}
