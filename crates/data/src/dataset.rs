//! Dataset driver: wires filter → patterns → ordering → chunks → masking
//! into a pull-based batch source.
//!
//! Single-threaded and synchronous. The only state crossing batch
//! boundaries is the curriculum cursor and the shared rng, both advanced
//! deterministically in iteration order; concurrent iteration over one
//! instance is not supported. Stopping early is just ceasing to call
//! [`MlmDataset::next_batch`].

use std::ops::Range;

use candle_core::Device;
use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::SeedableRng;

use masklm_common::{Error, PipelineMode, PipelineParams, Result};

use crate::batcher::{chunk_ranges, order_records};
use crate::curriculum::{num_batches, Curriculum};
use crate::encoder::{TokenEncoder, MASK_SYMBOL};
use crate::filter::filter_sequences;
use crate::masking::{mask_batch, MaskedBatch};
use crate::patterns::{generate_patterns, MaskPattern};

/// One (sequence, mask pattern) pair — the unit of the working dataset.
/// A sequence yields one record per generated pattern; in probing mode,
/// exactly one record with the marker-derived pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    /// Index into the retained-sequence list.
    pub sequence_index: usize,
    pub pattern: MaskPattern,
}

/// The assembled pipeline. Construct once, pull batches until `None`,
/// call [`start_epoch`](Self::start_epoch) to go again.
#[derive(Debug)]
pub struct MlmDataset<E: TokenEncoder> {
    sequences: Vec<String>,
    records: Vec<DataRecord>,
    chunks: Vec<Range<usize>>,
    chunk_cursor: usize,
    curriculum: Curriculum,
    encoder: E,
    params: PipelineParams,
    mask_symbol_id: u32,
    rng: StdRng,
    device: Device,
}

impl<E: TokenEncoder> MlmDataset<E> {
    /// Build a training dataset: validate params, filter sequences,
    /// generate mask patterns, order records, plan the first epoch.
    pub fn new(
        sequences: Vec<String>,
        encoder: E,
        params: PipelineParams,
        rng: StdRng,
        device: Device,
    ) -> Result<Self> {
        params.validate()?;
        Self::build(sequences, encoder, params, rng, device)
    }

    /// Build a probing dataset: mask patterns come from mask-symbol suffix
    /// markers in the input text, one record per sequence, fixed probing
    /// params. Nothing is drawn from the rng on this path.
    pub fn for_probing(sequences: Vec<String>, encoder: E, device: Device) -> Result<Self> {
        let params = PipelineParams::probing();
        params.validate()?;
        Self::build(sequences, encoder, params, StdRng::seed_from_u64(0), device)
    }

    fn build(
        sequences: Vec<String>,
        encoder: E,
        params: PipelineParams,
        mut rng: StdRng,
        device: Device,
    ) -> Result<Self> {
        let mask_symbol_id = encoder.symbol_id(MASK_SYMBOL)?;

        if sequences.is_empty() {
            tracing::warn!("no sequences passed to the dataset; it will yield zero batches");
        }
        let outcome = filter_sequences(&sequences, &encoder, &params)?;

        let mut records = Vec::new();
        match params.mode {
            PipelineMode::Probing => {
                for (sequence_index, s) in outcome.sequences.iter().enumerate() {
                    let encoded = encoder.encode(s)?;
                    let pattern: MaskPattern = encoded
                        .tokens
                        .iter()
                        .enumerate()
                        .filter(|(_, token)| token.ends_with(MASK_SYMBOL))
                        .map(|(i, _)| i)
                        .collect();
                    records.push(DataRecord {
                        sequence_index,
                        pattern,
                    });
                }
            }
            PipelineMode::Training => {
                tracing::info!("creating mask patterns");
                let bar = ProgressBar::new(outcome.token_counts.len() as u64);
                for (sequence_index, &num_tokens) in outcome.token_counts.iter().enumerate() {
                    for pattern in generate_patterns(num_tokens, &params, &mut rng) {
                        records.push(DataRecord {
                            sequence_index,
                            pattern,
                        });
                    }
                    bar.inc(1);
                }
                bar.finish_and_clear();
                order_records(&mut records, params.consecutive_masking, &mut rng);
            }
        }

        let total_batches = num_batches(
            records.len(),
            params.batch_size,
            params.sample_with_replacement,
        );
        tracing::info!(
            num_records = records.len(),
            num_batches = total_batches,
            "dataset ready"
        );
        let curriculum = Curriculum::new(
            params.leave_unmasked_prob_start,
            params.leave_unmasked_prob,
            total_batches,
        );

        let mut dataset = Self {
            sequences: outcome.sequences,
            records,
            chunks: Vec::new(),
            chunk_cursor: 0,
            curriculum,
            encoder,
            params,
            mask_symbol_id,
            rng,
            device,
        };
        dataset.start_epoch();
        Ok(dataset)
    }

    /// Plan a fresh epoch: new chunk order (a new random draw when sampling
    /// with replacement), curriculum rewound. Upstream stages — filtering,
    /// pattern generation, record ordering — are not recomputed.
    pub fn start_epoch(&mut self) {
        self.chunks = chunk_ranges(
            self.records.len(),
            self.params.batch_size,
            self.params.sample_with_replacement,
            &mut self.rng,
        );
        self.chunk_cursor = 0;
        self.curriculum.reset();
    }

    /// Produce the next vectorized batch, or `None` when the epoch is done.
    ///
    /// Each call consumes one chunk, one curriculum value, and whatever the
    /// mask/replace engine draws from the rng — in that order, always.
    pub fn next_batch(&mut self) -> Result<Option<MaskedBatch>> {
        let Some(range) = self.chunks.get(self.chunk_cursor).cloned() else {
            if self.curriculum.remaining() != 0 {
                return Err(Error::Configuration(format!(
                    "batch count miscalculated: {} curriculum values left after the final batch",
                    self.curriculum.remaining()
                )));
            }
            return Ok(None);
        };
        self.chunk_cursor += 1;

        let texts: Vec<String> = self.records[range.clone()]
            .iter()
            .map(|record| self.sequences[record.sequence_index].clone())
            .collect();
        let patterns: Vec<MaskPattern> = self.records[range]
            .iter()
            .map(|record| record.pattern.clone())
            .collect();

        let encodings = self.encoder.encode_batch(&texts)?;
        let leave_unmasked_prob = self.curriculum.next_prob()?;
        let batch = mask_batch(
            &encodings,
            &patterns,
            leave_unmasked_prob,
            &self.params,
            self.mask_symbol_id,
            self.encoder.vocab_size(),
            &mut self.rng,
            &self.device,
        )?;
        Ok(Some(batch))
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Batches in one epoch.
    pub fn num_batches(&self) -> usize {
        self.chunks.len()
    }

    pub fn records(&self) -> &[DataRecord] {
        &self.records
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::WordVocab;
    use masklm_common::MaskProbability;

    fn dataset_with(
        corpus: &[&str],
        params: PipelineParams,
        seed: u64,
    ) -> MlmDataset<WordVocab> {
        let sequences: Vec<String> = corpus.iter().map(|s| s.to_string()).collect();
        let vocab = WordVocab::new(&sequences);
        MlmDataset::new(
            sequences,
            vocab,
            params,
            StdRng::seed_from_u64(seed),
            Device::Cpu,
        )
        .unwrap()
    }

    #[test]
    fn end_to_end_single_batch_scenario() {
        let params = PipelineParams {
            max_num_tokens_in_sequence: 10,
            mask_pattern_size: 1,
            num_mask_patterns: 1,
            batch_size: 2,
            ..Default::default()
        };
        let mut dataset = dataset_with(&["the cat sat", "a dog ran fast"], params, 42);

        assert_eq!(dataset.num_records(), 2);
        assert_eq!(dataset.num_batches(), 1);

        let batch = dataset.next_batch().unwrap().unwrap();
        assert!(dataset.next_batch().unwrap().is_none());

        let mask: Vec<Vec<u8>> = batch.mask.to_vec2().unwrap();
        assert_eq!(mask.len(), 2);
        for row in &mask {
            assert_eq!(row.iter().filter(|&&m| m == 1).count(), 1);
            // never the BOS column
            assert_eq!(row[0], 0);
        }

        // labels hold the two original ids at the masked positions
        let ids: Vec<Vec<u32>> = batch.input_ids.to_vec2().unwrap();
        let attention: Vec<Vec<u32>> = batch.attention_mask.to_vec2().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].len(), attention[0].len());
        let labels: Vec<u32> = batch.labels.unwrap().to_vec1().unwrap();
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn one_record_per_pattern_and_consecutive_order() {
        let params = PipelineParams {
            mask_pattern_size: 1,
            num_mask_patterns: 3,
            batch_size: 4,
            ..Default::default()
        };
        let dataset = dataset_with(&["the cat sat on mats", "a dog ran"], params, 7);
        // 3 patterns per sequence, order preserved: all records of sequence 0
        // precede all records of sequence 1
        assert_eq!(dataset.num_records(), 6);
        let indices: Vec<usize> = dataset.records().iter().map(|r| r.sequence_index).collect();
        assert_eq!(indices, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn epoch_restart_reproduces_batch_count() {
        let params = PipelineParams {
            mask_pattern_size: 1,
            num_mask_patterns: 2,
            batch_size: 3,
            ..Default::default()
        };
        let mut dataset = dataset_with(&["the cat sat", "a dog ran", "birds fly high"], params, 3);

        let mut first_epoch = 0;
        while dataset.next_batch().unwrap().is_some() {
            first_epoch += 1;
        }
        assert_eq!(first_epoch, dataset.num_batches());

        dataset.start_epoch();
        let mut second_epoch = 0;
        while dataset.next_batch().unwrap().is_some() {
            second_epoch += 1;
        }
        assert_eq!(second_epoch, first_epoch);
    }

    #[test]
    fn curriculum_advances_once_per_batch() {
        let params = PipelineParams {
            mask_pattern_size: 1,
            num_mask_patterns: 4,
            batch_size: 2,
            leave_unmasked_prob_start: 0.0,
            leave_unmasked_prob: 0.5,
            ..Default::default()
        };
        let mut dataset = dataset_with(&["the cat sat", "a dog ran"], params, 5);
        let total = dataset.num_batches();
        assert_eq!(dataset.curriculum.len(), total);
        for consumed in 1..=total {
            dataset.next_batch().unwrap().unwrap();
            assert_eq!(dataset.curriculum.remaining(), total - consumed);
        }
        assert!(dataset.next_batch().unwrap().is_none());
    }

    #[test]
    fn empty_corpus_yields_zero_batches() {
        let mut dataset = dataset_with(&[], PipelineParams::default(), 0);
        assert_eq!(dataset.num_batches(), 0);
        assert!(dataset.next_batch().unwrap().is_none());
    }

    #[test]
    fn invalid_params_fail_before_any_batch() {
        let sequences = vec!["the cat sat".to_string()];
        let vocab = WordVocab::new(&sequences);
        let params = PipelineParams {
            probabilistic_masking: true,
            mask_probability: MaskProbability::Fixed(2.0),
            ..Default::default()
        };
        let err = MlmDataset::new(
            sequences,
            vocab,
            params,
            StdRng::seed_from_u64(0),
            Device::Cpu,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn probing_patterns_come_from_markers() {
        let sequences = vec![
            "the cat<mask> sat".to_string(),
            "a dog ran".to_string(),
        ];
        let vocab = WordVocab::new(&sequences);
        let mut dataset = MlmDataset::for_probing(sequences, vocab, Device::Cpu).unwrap();

        let records = dataset.records().to_vec();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pattern, vec![1]);
        assert!(records[1].pattern.is_empty());

        let batch = dataset.next_batch().unwrap().unwrap();
        // one marker in the batch → labels exist, with exactly one entry
        let labels: Vec<u32> = batch.labels.unwrap().to_vec1().unwrap();
        assert_eq!(labels.len(), 1);
        let mask: Vec<Vec<u8>> = batch.mask.to_vec2().unwrap();
        assert_eq!(mask[0][2], 1); // pattern index 1, shifted past BOS
        assert_eq!(mask.iter().flatten().filter(|&&m| m == 1).count(), 1);
    }

    #[test]
    fn forced_choice_probing_has_no_labels() {
        let sequences = vec!["the cat sat".to_string(), "a dog ran".to_string()];
        let vocab = WordVocab::new(&sequences);
        let mut dataset = MlmDataset::for_probing(sequences, vocab, Device::Cpu).unwrap();
        let batch = dataset.next_batch().unwrap().unwrap();
        assert!(batch.labels.is_none());
    }

    #[test]
    fn with_replacement_batch_count_documented_drift() {
        let params = PipelineParams {
            mask_pattern_size: 1,
            num_mask_patterns: 3,
            batch_size: 2,
            sample_with_replacement: true,
            ..Default::default()
        };
        // 3 sequences × 3 patterns = 9 records → floor(9 / 2) = 4 batches,
        // one fewer than the without-replacement chunk count of 5
        let mut dataset =
            dataset_with(&["the cat sat", "a dog ran", "birds fly high"], params, 11);
        assert_eq!(dataset.num_batches(), 4);
        let mut count = 0;
        while dataset.next_batch().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 4);
    }
}
