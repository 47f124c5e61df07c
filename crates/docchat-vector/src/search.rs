use crate::IndexEntry;

/// Squared Euclidean distance, the value a flat L2 index reports.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Map a distance onto `(0, 1]`; smaller distances score higher.
pub fn similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Exhaustive k-nearest-neighbour scan. Returns `(offset, distance)` pairs,
/// closest first, at most `min(k, entries.len())` of them. Ties keep
/// insertion order.
pub fn nearest(entries: &[IndexEntry], query: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (i, squared_l2(&e.vector, query)))
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    scored.truncate(k.min(entries.len()));
    scored
}
