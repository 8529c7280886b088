//! In-memory whitespace-vocabulary encoder for tests. No files touched.

use std::collections::HashMap;

use masklm_common::Result;

use crate::encoder::{Encoded, TokenEncoder, BOS_SYMBOL, EOS_SYMBOL, MASK_SYMBOL, PAD_SYMBOL};

pub(crate) const RESERVED_SYMBOLS: [&str; 6] =
    [PAD_SYMBOL, "<unk>", BOS_SYMBOL, EOS_SYMBOL, MASK_SYMBOL, "<sep>"];

/// Whitespace tokenizer over a fixed word vocabulary. Words after the 6
/// reserved symbols get ascending ids in order of first appearance.
#[derive(Debug, Clone)]
pub(crate) struct WordVocab {
    words: HashMap<String, u32>,
    size: usize,
    /// When set, words ending in "ing" split into two tokens, imitating a
    /// sub-word tokenizer (used to trigger probing mismatches).
    subword_splits: bool,
}

impl WordVocab {
    pub fn new(corpus: &[String]) -> Self {
        let mut words = HashMap::new();
        for (i, symbol) in RESERVED_SYMBOLS.iter().enumerate() {
            words.insert(symbol.to_string(), i as u32);
        }
        let mut next = RESERVED_SYMBOLS.len() as u32;
        for sequence in corpus {
            for word in sequence.split_whitespace() {
                let base = word.strip_suffix(MASK_SYMBOL).unwrap_or(word);
                if !base.is_empty() && !words.contains_key(base) {
                    words.insert(base.to_string(), next);
                    next += 1;
                }
            }
        }
        let size = words.len();
        Self {
            words,
            size,
            subword_splits: false,
        }
    }

    pub fn with_subword_splits(mut self) -> Self {
        self.subword_splits = true;
        self
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in text.split_whitespace() {
            if self.subword_splits && word.len() > 3 && word.ends_with("ing") {
                tokens.push(word[..word.len() - 3].to_string());
                tokens.push("ing".to_string());
            } else {
                tokens.push(word.to_string());
            }
        }
        tokens
    }

    fn id_of(&self, token: &str) -> u32 {
        // probing marker words masquerade as the mask symbol in inputs
        if token.len() > MASK_SYMBOL.len() && token.ends_with(MASK_SYMBOL) {
            return RESERVED_SYMBOLS
                .iter()
                .position(|&s| s == MASK_SYMBOL)
                .unwrap() as u32;
        }
        self.words.get(token).copied().unwrap_or(1) // <unk>
    }
}

impl TokenEncoder for WordVocab {
    fn encode(&self, text: &str) -> Result<Encoded> {
        let tokens = self.tokenize(text);
        let ids = tokens.iter().map(|t| self.id_of(t)).collect::<Vec<_>>();
        let attention_mask = vec![1; tokens.len()];
        Ok(Encoded {
            ids,
            tokens,
            attention_mask,
        })
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Encoded>> {
        let plain: Vec<Encoded> = texts
            .iter()
            .map(|t| self.encode(t))
            .collect::<Result<_>>()?;
        let padded_len = plain.iter().map(Encoded::len).max().unwrap_or(0) + 2;
        let bos = self.words[BOS_SYMBOL];
        let eos = self.words[EOS_SYMBOL];
        let pad = self.words[PAD_SYMBOL];
        Ok(plain
            .into_iter()
            .map(|encoded| {
                let mut ids = Vec::with_capacity(padded_len);
                let mut tokens = Vec::with_capacity(padded_len);
                ids.push(bos);
                tokens.push(BOS_SYMBOL.to_string());
                ids.extend(&encoded.ids);
                tokens.extend(encoded.tokens);
                ids.push(eos);
                tokens.push(EOS_SYMBOL.to_string());
                let mut attention_mask = vec![1u32; ids.len()];
                while ids.len() < padded_len {
                    ids.push(pad);
                    tokens.push(PAD_SYMBOL.to_string());
                    attention_mask.push(0);
                }
                Encoded {
                    ids,
                    tokens,
                    attention_mask,
                }
            })
            .collect())
    }

    fn token_to_id(&self, symbol: &str) -> Option<u32> {
        self.words.get(symbol).copied()
    }

    fn vocab_size(&self) -> usize {
        self.size
    }
}
