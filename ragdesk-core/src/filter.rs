//! Similarity-threshold filtering of nearest-neighbor results.

use crate::document::{NeighborResult, RetrievedPassage};

/// Convert a cosine distance into a similarity score (`1 - distance`).
///
/// This is a display and threshold convenience, not a metric: distance 0.0
/// maps to 1.0 and distance 1.0 maps to 0.0. Opposite vectors go negative.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 - distance
}

/// Keep the neighbors whose similarity is at least `threshold`.
///
/// The input order (ascending distance) is preserved. An empty result is not an
/// error; it means no passage is close enough to ground an answer.
pub fn filter_by_threshold(neighbors: Vec<NeighborResult>, threshold: f32) -> Vec<RetrievedPassage> {
    neighbors
        .into_iter()
        .filter_map(|neighbor| {
            let similarity = similarity_from_distance(neighbor.distance);
            (similarity >= threshold).then_some(RetrievedPassage { neighbor, similarity })
        })
        .collect()
}
