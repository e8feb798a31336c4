//! Collection and order-statistic helpers used by the clustering engine.

use crate::error::{MeanShiftError, Result};
use rand::seq::index;
use rand::Rng;
use std::collections::HashMap;
use std::hash::Hash;

/// Return the k-th smallest value of `values`, where `k` starts at 1.
///
/// Uses quickselect on a scratch copy, so the cost is O(n) on average
/// rather than the O(n log n) of a full sort. NaN values order after every
/// finite value.
///
/// # Errors
/// Returns `KthOutOfRange` if `k == 0` or `k > values.len()`.
pub fn kth_smallest(values: &[f32], k: usize) -> Result<f32> {
    if k == 0 || k > values.len() {
        return Err(MeanShiftError::kth_out_of_range(k, values.len()));
    }

    let mut scratch = values.to_vec();
    let (_, kth, _) = scratch.select_nth_unstable_by(k - 1, |a, b| a.total_cmp(b));
    Ok(*kth)
}

/// Return the keys of `map` ordered by their values.
///
/// Equal values are ordered by ascending key so the result does not depend
/// on hash iteration order.
pub fn keys_sorted_by_value<K, V>(map: &HashMap<K, V>, descending: bool) -> Vec<K>
where
    K: Copy + Ord + Hash,
    V: Ord,
{
    let mut entries: Vec<(&K, &V)> = map.iter().collect();
    entries.sort_by(|a, b| {
        let by_value = if descending { b.1.cmp(a.1) } else { a.1.cmp(b.1) };
        by_value.then_with(|| a.0.cmp(b.0))
    });
    entries.into_iter().map(|(k, _)| *k).collect()
}

/// Remove randomly chosen elements from `items` until `items.len() <= limit`.
///
/// Survivors keep their relative order. Runs in O(n).
pub fn reduce_randomly<T, R: Rng + ?Sized>(items: &mut Vec<T>, limit: usize, rng: &mut R) {
    if items.len() <= limit {
        return;
    }

    let mut keep = vec![false; items.len()];
    for i in index::sample(rng, items.len(), limit) {
        keep[i] = true;
    }

    let mut flags = keep.into_iter();
    items.retain(|_| flags.next().unwrap_or(false));
}
