use foundation::math::precision::stable_total_cmp_f64;

use crate::paper::Paper;

/// Indices of the `n` papers closest to `papers[target]`.
///
/// Partial-selection scan over fixed slots, `O(P * n)`:
/// - candidates are visited in load order, `target` itself is skipped;
/// - while a slot is empty the candidate fills the first empty slot;
/// - once all slots are full, the slot holding the largest distance (the
///   first one on ties) is overwritten if the candidate is strictly closer.
///
/// The result is in slot order, not sorted by distance. Fewer than `n`
/// indices come back when the set is too small, and none for an
/// out-of-range `target`.
pub fn nearest_neighbors(papers: &[Paper], target: usize, n: usize) -> Vec<usize> {
    let Some(origin) = papers.get(target).map(|p| p.point) else {
        return Vec::new();
    };
    // Only `len - 1` candidates exist, so larger counts cannot fill a slot.
    let n = n.min(papers.len() - 1);
    if n == 0 {
        return Vec::new();
    }

    let mut min_distances: Vec<Option<f64>> = vec![None; n];
    let mut min_indices: Vec<Option<usize>> = vec![None; n];

    for (i, other) in papers.iter().enumerate() {
        if i == target {
            continue;
        }
        let distance = origin.distance(other.point);

        if let Some(slot) = min_distances.iter().position(Option::is_none) {
            min_distances[slot] = Some(distance);
            min_indices[slot] = Some(i);
            continue;
        }

        let (worst_slot, worst) = farthest_slot(&min_distances);
        if stable_total_cmp_f64(distance, worst).is_lt() {
            min_distances[worst_slot] = Some(distance);
            min_indices[worst_slot] = Some(i);
        }
    }

    min_indices.into_iter().flatten().collect()
}

/// First slot holding the maximum distance. Only called with all slots filled.
fn farthest_slot(distances: &[Option<f64>]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (slot, d) in distances.iter().enumerate() {
        let d = d.unwrap_or(f64::INFINITY);
        if slot == 0 || stable_total_cmp_f64(d, best.1).is_gt() {
            best = (slot, d);
        }
    }
    best
}
