//! Brute-force similarity ranking over a [`CorpusIndex`].
//!
//! # Algorithm
//!
//! 1. `similarity_i = dot(vectors[i], query)` for every row. Both sides are
//!    unit vectors, so this is cosine similarity in `[-1, 1]`.
//! 2. Stable sort by similarity, descending. Equal scores keep taxonomy order.
//! 3. Walk the sorted rows, skipping any below `threshold`, and stop once
//!    `top_n` rows are accepted.
//! 4. Ranks are 1-based in acceptance order.
//!
//! Nothing here normalizes: vectors are normalized once when they are
//! embedded. A zero query vector is not special-cased; every similarity is
//! `0.0` and the threshold decides.

use std::cmp::Ordering;

use crate::flatten::ReferenceStatement;
use crate::index::CorpusIndex;

/// One accepted match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub statement: ReferenceStatement,
    /// Raw cosine similarity, full precision.
    pub similarity: f32,
    /// 1-based position in the result list.
    pub rank: usize,
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Rank every statement in `index` against `query`.
///
/// Returns at most `top_n` results, all with `similarity >= threshold`,
/// ordered by similarity descending. An empty list means nothing cleared
/// the threshold. `threshold` is used as given, without clamping.
pub fn rank(index: &CorpusIndex, query: &[f32], top_n: usize, threshold: f32) -> Vec<MatchResult> {
    let mut scored: Vec<(usize, f32)> = index
        .vectors()
        .iter()
        .enumerate()
        .map(|(i, v)| (i, dot(v, query)))
        .collect();

    // `sort_by` is stable; ties keep emission order.
    scored.sort_by(|a, b| {
        sort_key(b.1)
            .partial_cmp(&sort_key(a.1))
            .unwrap_or(Ordering::Equal)
    });

    scored
        .into_iter()
        // NaN never clears the threshold.
        .filter(|(_, sim)| *sim >= threshold)
        .take(top_n)
        .enumerate()
        .map(|(pos, (i, similarity))| MatchResult {
            statement: index.statements()[i].clone(),
            similarity,
            rank: pos + 1,
        })
        .collect()
}

/// NaN sorts last; `-0.0` and `0.0` compare equal.
fn sort_key(similarity: f32) -> f32 {
    if similarity.is_nan() {
        f32::NEG_INFINITY
    } else {
        similarity
    }
}
