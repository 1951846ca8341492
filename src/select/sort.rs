//! In-place descending sort of detections by score.
//!
//! The sort is a Hoare partition-exchange sort pivoting on the middle
//! element. It is not stable. The parallel strategy recurses into the two
//! partitions with `rayon::join`; the partitions are disjoint `split_at_mut`
//! halves, so the result is identical to the sequential order.

use crate::detection::Detection;

/// Slices shorter than this are always sorted on the current thread.
#[cfg(feature = "rayon")]
const PAR_MIN_LEN: usize = 512;

/// How the confidence sort runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortStrategy {
    /// Single-threaded recursion.
    #[default]
    Sequential,
    /// Recurse into both partitions in parallel. Falls back to sequential
    /// when the `rayon` feature is disabled.
    Parallel,
}

/// Sorts `dets` by non-increasing score using `strategy`.
pub fn sort_by_score_desc(dets: &mut [Detection], strategy: SortStrategy) {
    match strategy {
        SortStrategy::Sequential => qsort_descent_inplace(dets),
        #[cfg(feature = "rayon")]
        SortStrategy::Parallel => qsort_descent_par(dets),
        #[cfg(not(feature = "rayon"))]
        SortStrategy::Parallel => qsort_descent_inplace(dets),
    }
}

/// Sequential partition-exchange sort, highest score first.
pub fn qsort_descent_inplace(dets: &mut [Detection]) {
    if dets.len() <= 1 {
        return;
    }
    let (left_end, right_start) = partition_desc(dets);
    let (left, rest) = dets.split_at_mut(left_end);
    qsort_descent_inplace(left);
    qsort_descent_inplace(&mut rest[right_start - left_end..]);
}

#[cfg(feature = "rayon")]
fn qsort_descent_par(dets: &mut [Detection]) {
    if dets.len() < PAR_MIN_LEN {
        qsort_descent_inplace(dets);
        return;
    }
    let (left_end, right_start) = partition_desc(dets);
    let (left, rest) = dets.split_at_mut(left_end);
    let right = &mut rest[right_start - left_end..];
    rayon::join(|| qsort_descent_par(left), || qsort_descent_par(right));
}

/// Partitions around the middle element.
///
/// Returns `(left_end, right_start)`: `dets[..left_end]` holds scores `>=`
/// the pivot, `dets[right_start..]` holds scores `<=` the pivot and anything
/// in between equals the pivot. Requires `dets.len() >= 2`.
fn partition_desc(dets: &mut [Detection]) -> (usize, usize) {
    let pivot = dets[(dets.len() - 1) / 2].score;
    let mut i = 0usize;
    // `j` is one past the right cursor so it never underflows.
    let mut j = dets.len();

    while i < j {
        while dets[i].score > pivot {
            i += 1;
        }
        while dets[j - 1].score < pivot {
            j -= 1;
        }
        if i < j {
            dets.swap(i, j - 1);
            i += 1;
            j -= 1;
        }
    }
    (j, i)
}

#[cfg(test)]
mod tests {
    use super::{qsort_descent_inplace, sort_by_score_desc, SortStrategy};
    use crate::detection::Detection;
    use crate::geometry::Rect;

    fn dets(scores: &[f32]) -> Vec<Detection> {
        scores
            .iter()
            .enumerate()
            .map(|(idx, &score)| Detection::new(Rect::new(idx as f32, 0.0, 1.0, 1.0), idx, score))
            .collect()
    }

    fn scores(dets: &[Detection]) -> Vec<f32> {
        dets.iter().map(|d| d.score).collect()
    }

    #[test]
    fn sorts_descending() {
        let mut v = dets(&[0.3, 0.9, 0.1, 0.5, 0.7]);
        qsort_descent_inplace(&mut v);
        assert_eq!(scores(&v), vec![0.9, 0.7, 0.5, 0.3, 0.1]);
    }

    #[test]
    fn handles_duplicates_and_small_inputs() {
        let mut v = dets(&[0.5, 0.5, 0.2, 0.5, 0.8, 0.2]);
        qsort_descent_inplace(&mut v);
        assert_eq!(scores(&v), vec![0.8, 0.5, 0.5, 0.5, 0.2, 0.2]);

        let mut empty: Vec<Detection> = Vec::new();
        sort_by_score_desc(&mut empty, SortStrategy::Sequential);
        assert!(empty.is_empty());

        let mut single = dets(&[0.4]);
        sort_by_score_desc(&mut single, SortStrategy::Parallel);
        assert_eq!(scores(&single), vec![0.4]);
    }

    #[test]
    fn already_sorted_and_reversed_inputs() {
        let mut asc = dets(&[0.1, 0.2, 0.3, 0.4]);
        qsort_descent_inplace(&mut asc);
        assert_eq!(scores(&asc), vec![0.4, 0.3, 0.2, 0.1]);

        let mut desc = dets(&[0.4, 0.3, 0.2, 0.1]);
        qsort_descent_inplace(&mut desc);
        assert_eq!(scores(&desc), vec![0.4, 0.3, 0.2, 0.1]);
    }
}
