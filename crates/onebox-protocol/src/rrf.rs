//! Reciprocal rank fusion.
//!
//! Combines the rankings of independent retrievers into one: a document
//! scores `Σ 1/(rank_constant + rank_i)` over every ranking it appears
//! in, with ranks starting at 1. Documents found by several retrievers
//! float to the top even when no single retriever ranked them first.

use std::{cmp::Ordering, collections::HashMap};

/// Fuses independently ranked candidate id lists.
///
/// Returns `(id, fused_score)` pairs sorted best-first. Score ties break
/// by id so fusion is reproducible across runs.
pub fn fuse(rankings: &[Vec<String>], rank_constant: f32) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();

    for ranking in rankings {
        for (index, id) in ranking.iter().enumerate() {
            let rank = index as f32 + 1.0;
            *scores.entry(id.clone()).or_insert(0.0) += 1.0 / (rank_constant + rank);
        }
    }

    let mut fused: Vec<(String, f32)> = scores.into_iter().collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    fused
}
