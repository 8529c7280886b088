//! CLI for preparing MLM batches from a plain-text corpus.
//!
//! Pulls every batch the pipeline would feed a training or probing loop and
//! reports totals, so a corpus/tokenizer/params combination can be checked
//! before a run.

use std::path::PathBuf;

use anyhow::Context;
use candle_core::{DType, Device};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use masklm_common::PipelineParams;
use masklm_data::corpus::{load_sentences, make_sequences};
use masklm_data::{HfTokenizer, MlmDataset};

#[derive(Parser, Debug)]
#[command(name = "masklm-prepare", about = "Prepare masked-LM batches from a corpus")]
struct Args {
    /// Plain-text corpus, one sentence per line.
    #[arg(long)]
    corpus: PathBuf,
    /// Tokenizer file (tokenizer.json).
    #[arg(long)]
    tokenizer: PathBuf,
    /// Pipeline params JSON; created with defaults if missing.
    #[arg(long, default_value = "params.json")]
    params: PathBuf,
    /// Treat the corpus as mask-annotated probing sentences.
    #[arg(long)]
    probing: bool,
    /// Seed for reproducible pattern/batch sampling; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Sentences joined into one sequence.
    #[arg(long, default_value = "1")]
    sentences_per_sequence: usize,
    /// Stop after this many batches (0 = pull the whole epoch).
    #[arg(long, default_value = "0")]
    max_batches: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let params = if args.probing {
        PipelineParams::probing()
    } else if args.params.exists() {
        PipelineParams::load(&args.params)?
    } else {
        let default = PipelineParams::default();
        default.save(&args.params)?;
        eprintln!("Created default params at {}", args.params.display());
        default
    };

    let sentences = load_sentences(&args.corpus)
        .with_context(|| format!("load corpus {}", args.corpus.display()))?;
    let sequences = make_sequences(&sentences, args.sentences_per_sequence);

    let tokenizer = HfTokenizer::from_file(&args.tokenizer, params.max_num_tokens_in_sequence)
        .with_context(|| format!("load tokenizer {}", args.tokenizer.display()))?;

    let device = Device::Cpu;
    let mut dataset = if args.probing {
        MlmDataset::for_probing(sequences, tokenizer, device)?
    } else {
        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        MlmDataset::new(sequences, tokenizer, params, rng, device)?
    };

    tracing::info!(
        num_records = dataset.num_records(),
        num_batches = dataset.num_batches(),
        "pipeline ready"
    );

    let mut num_batches = 0usize;
    let mut num_masked_positions = 0u64;
    let mut num_labels = 0usize;
    while let Some(batch) = dataset.next_batch()? {
        let (rows, cols) = batch.input_ids.dims2()?;
        let masked = batch
            .mask
            .to_dtype(DType::U32)?
            .sum_all()?
            .to_scalar::<u32>()? as u64;
        num_masked_positions += masked;
        if let Some(labels) = &batch.labels {
            num_labels += labels.dim(0)?;
        }
        num_batches += 1;
        tracing::debug!(batch = num_batches, rows, cols, masked, "prepared batch");
        if args.max_batches > 0 && num_batches >= args.max_batches {
            break;
        }
    }

    tracing::info!(
        num_batches,
        num_masked_positions,
        num_labels,
        "finished epoch"
    );
    Ok(())
}
