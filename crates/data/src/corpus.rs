//! Corpus loading and splitting.
//!
//! Corpora are plain text, one sentence per line (probing corpora carry
//! mask-symbol suffix markers on target words). Sentences can be joined
//! into multi-sentence sequences before entering the pipeline.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::rngs::StdRng;
use rand::Rng;

use masklm_common::Result;

/// Read one sentence per line, skipping blank lines.
pub fn load_sentences(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        out.push(line.to_string());
    }
    tracing::info!(num_sentences = out.len(), path = %path.display(), "loaded corpus");
    Ok(out)
}

/// Join consecutive sentences into sequences of `num_sentences_per_input`
/// sentences each. The final sequence may hold fewer.
pub fn make_sequences(sentences: &[String], num_sentences_per_input: usize) -> Vec<String> {
    let n = num_sentences_per_input.max(1);
    let res: Vec<String> = sentences.chunks(n).map(|group| group.join(" ")).collect();
    tracing::info!(num_sequences = res.len(), "combined sentences into sequences");
    res
}

/// Seeded train/devel/test split. Each sequence lands in train with
/// probability `train_prob`; the remainder is halved between devel and test.
pub fn split_corpus(
    sequences: &[String],
    train_prob: f64,
    rng: &mut StdRng,
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut train = Vec::new();
    let mut devel = Vec::new();
    let mut test = Vec::new();
    for s in sequences {
        if rng.random::<f64>() < train_prob {
            train.push(s.clone());
        } else if rng.random::<f64>() < 0.5 {
            devel.push(s.clone());
        } else {
            test.push(s.clone());
        }
    }
    tracing::info!(
        train = train.len(),
        devel = devel.len(),
        test = test.len(),
        "split corpus"
    );
    (train, devel, test)
}

// ── Tests ───────────────────────────────────────────────────────────────────
