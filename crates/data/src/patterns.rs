//! Mask-pattern generation.
//!
//! A mask pattern is an ordered tuple of indices into the un-padded,
//! no-special-symbol token sequence of one filtered sequence. Two
//! interchangeable algorithms: combinatorial (distinct fixed-size index
//! subsets, sampled uniformly without replacement) and probabilistic
//! (independent per-token inclusion, empty draws rejected).

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;

use masklm_common::{MaskProbability, PipelineParams};

/// Indices of the tokens to mask within one sequence, ascending for
/// combinatorial and probabilistic draws.
pub type MaskPattern = Vec<usize>;

/// Populations larger than this are rejection-sampled instead of enumerated.
const MAX_ENUMERATED_PATTERNS: u128 = 100_000;

/// Generate the mask patterns for one sequence of `num_tokens` tokens.
///
/// The requested pattern count and the pattern size both shrink to what the
/// sequence can support: `pattern_size = min(configured, num_tokens)` and at
/// most `C(num_tokens, pattern_size)` distinct combinatorial patterns exist.
pub fn generate_patterns(
    num_tokens: usize,
    params: &PipelineParams,
    rng: &mut StdRng,
) -> Vec<MaskPattern> {
    if num_tokens == 0 {
        return Vec::new();
    }
    if params.probabilistic_masking {
        let prob = match params.mask_probability {
            MaskProbability::Auto => params.mask_pattern_size as f64 / num_tokens as f64,
            MaskProbability::Fixed(p) => p,
        };
        probabilistic_patterns(num_tokens, prob, params.num_mask_patterns, rng)
    } else {
        combinatorial_patterns(
            num_tokens,
            params.mask_pattern_size,
            params.num_mask_patterns,
            rng,
        )
    }
}

/// Sample `requested` distinct size-`k` subsets of `{0..n-1}` uniformly
/// without replacement, capped at the population size.
fn combinatorial_patterns(
    n: usize,
    pattern_size: usize,
    requested: usize,
    rng: &mut StdRng,
) -> Vec<MaskPattern> {
    let k = pattern_size.min(n);
    let population = n_choose_k(n, k);
    let num_patterns = (requested as u128).min(population) as usize;

    if population <= MAX_ENUMERATED_PATTERNS {
        let all = combinations(n, k);
        index::sample(rng, all.len(), num_patterns)
            .iter()
            .map(|i| all[i].clone())
            .collect()
    } else {
        // Too many subsets to materialize: draw distinct sorted k-subsets
        // directly. Collisions are rare at this population size.
        let mut seen: HashSet<MaskPattern> = HashSet::with_capacity(num_patterns);
        let mut out = Vec::with_capacity(num_patterns);
        while out.len() < num_patterns {
            let mut subset = index::sample(rng, n, k).into_vec();
            subset.sort_unstable();
            if seen.insert(subset.clone()) {
                out.push(subset);
            }
        }
        out
    }
}

/// Include each index independently with probability `prob`; reject empty
/// draws until `requested` non-empty patterns exist.
fn probabilistic_patterns(
    n: usize,
    prob: f64,
    requested: usize,
    rng: &mut StdRng,
) -> Vec<MaskPattern> {
    let mut out = Vec::with_capacity(requested);
    while out.len() < requested {
        let pattern: MaskPattern = (0..n).filter(|_| rng.random::<f64>() < prob).collect();
        if !pattern.is_empty() {
            out.push(pattern);
        }
    }
    out
}

/// All size-`k` index subsets of `{0..n-1}` in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k > n {
        return out;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        // rightmost index that can still advance
        let mut i = k;
        while i > 0 && idx[i - 1] == n - k + (i - 1) {
            i -= 1;
        }
        if i == 0 {
            break;
        }
        idx[i - 1] += 1;
        for j in i..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
    out
}

fn n_choose_k(n: usize, k: usize) -> u128 {
    let k = k.min(n - k);
    let mut res: u128 = 1;
    for i in 0..k {
        res = res.saturating_mul((n - i) as u128) / (i as u128 + 1);
    }
    res
}

// ── Tests ───────────────────────────────────────────────────────────────────
