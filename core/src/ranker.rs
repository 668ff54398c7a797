use crate::catalog::ItemId;
use crate::config::RankWeights;
use crate::index::{SparseVector, TextIndex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub id: ItemId,
    pub similarity: f32,
    pub popularity: f64,
    pub score: f64,
}

/// Cosine of the angle between `a` and `b`; 0 when either is the zero vector.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f32 {
    if a.is_zero() || b.is_zero() {
        return 0.0;
    }
    let denom = a.norm() * b.norm();
    if denom == 0.0 { 0.0 } else { a.dot(b) / denom }
}

/// Score `candidates` against `query` and keep the best `n`.
///
/// `popularity` is indexed by item id and must be one consistent snapshot.
/// Popularity is min-max scaled over the candidates so feedback growth stays bounded.
pub fn rank(
    query: &SparseVector,
    candidates: &[ItemId],
    index: &TextIndex,
    popularity: &[f64],
    weights: RankWeights,
    n: usize,
) -> Vec<Ranked> {
    if candidates.is_empty() || n == 0 {
        return Vec::new();
    }

    let pop_of = |id: ItemId| popularity.get(id as usize).copied().unwrap_or(0.0);
    let (min, max) = candidates
        .iter()
        .map(|&id| pop_of(id))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p), hi.max(p)));
    let range = max - min;

    // Candidates arrive in catalog order, which is the final tie-breaker
    let mut scored: Vec<(usize, Ranked)> = candidates
        .iter()
        .enumerate()
        .map(|(pos, &id)| {
            let similarity = index.vector(id).map_or(0.0, |v| cosine(query, v));
            let popularity = pop_of(id);
            let normalized = if range > 0.0 { (popularity - min) / range } else { 0.0 };
            let score = weights.similarity * f64::from(similarity) + weights.popularity * normalized;
            (pos, Ranked { id, similarity, popularity, score })
        })
        .collect();

    scored.sort_by(|(pa, a), (pb, b)| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.similarity.total_cmp(&a.similarity))
            .then_with(|| b.popularity.total_cmp(&a.popularity))
            .then_with(|| pa.cmp(pb))
    });
    scored.truncate(n);
    scored.into_iter().map(|(_, r)| r).collect()
}
