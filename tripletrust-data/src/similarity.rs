// tripletrust-data/src/similarity.rs

use std::fmt::Debug;

use crate::labels::LabelSet;

/// A symmetric similarity score between two label sets.
///
/// Multi-label strategies use it to compute triplet margins and to rank
/// candidate negatives. Implementations must be pure.
pub trait SimilarityMetric: Debug + Send + Sync {
    /// Returns a score in `[0, 1]`; identical non-empty sets score `1.0`.
    fn similarity(&self, a: &LabelSet, b: &LabelSet) -> f32;
}

/// Intersection-over-union of two label sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jaccard;

impl SimilarityMetric for Jaccard {
    fn similarity(&self, a: &LabelSet, b: &LabelSet) -> f32 {
        jaccard(a, b)
    }
}

/// `|a ∩ b| / |a ∪ b|`, defined as `0.0` when both sets are empty.
///
/// Empty label sets never reach this function from a built `LabelIndex`,
/// which rejects them as malformed.
pub fn jaccard(a: &LabelSet, b: &LabelSet) -> f32 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}
