//! Splitting an index range into balanced, contiguous worker ranges.

use std::ops::Range;

/// Clamps a requested worker count to `[1, max(num_points, 1)]`.
///
/// Negative and zero requests mean a single worker; more workers than
/// points would leave some of them with nothing to do.
pub fn effective_threads(num_points: usize, requested: i64) -> usize {
    let upper = num_points.max(1);
    if requested < 1 {
        1
    } else {
        usize::try_from(requested).map_or(upper, |n| n.min(upper))
    }
}

/// Half-open index ranges, one per worker, covering `[0, num_points)` once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    ranges: Vec<Range<usize>>,
}

impl PartitionPlan {
    /// The first `num_points % workers` ranges get one extra item.
    pub fn new(num_points: usize, requested_threads: i64) -> Self {
        if num_points == 0 {
            return PartitionPlan { ranges: Vec::new() };
        }

        let workers = effective_threads(num_points, requested_threads);
        let chunk = num_points / workers;
        let remainder = num_points % workers;

        let mut ranges = Vec::with_capacity(workers);
        let mut start = 0;
        for worker_id in 0..workers {
            let len = if worker_id < remainder { chunk + 1 } else { chunk };
            ranges.push(start..start + len);
            start += len;
        }

        PartitionPlan { ranges }
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of indices covered.
    pub fn num_points(&self) -> usize {
        self.ranges.last().map_or(0, |r| r.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_first_workers() {
        let plan = PartitionPlan::new(10, 3);
        assert_eq!(plan.ranges(), &[0..4, 4..7, 7..10]);
    }

    #[test]
    fn even_split() {
        let plan = PartitionPlan::new(12, 4);
        assert_eq!(plan.ranges(), &[0..3, 3..6, 6..9, 9..12]);
    }

    #[test]
    fn more_threads_than_points() {
        let plan = PartitionPlan::new(5, 10);
        assert_eq!(plan.ranges(), &[0..1, 1..2, 2..3, 3..4, 4..5]);
    }

    #[test]
    fn non_positive_threads_mean_one_worker() {
        assert_eq!(PartitionPlan::new(1000, -1).ranges(), &[0..1000]);
        assert_eq!(PartitionPlan::new(1000, 0).ranges(), &[0..1000]);
    }

    #[test]
    fn zero_points_is_empty() {
        let plan = PartitionPlan::new(0, 4);
        assert!(plan.is_empty());
        assert_eq!(plan.num_points(), 0);
    }

    #[test]
    fn clamping() {
        assert_eq!(effective_threads(0, 4), 1);
        assert_eq!(effective_threads(0, -3), 1);
        assert_eq!(effective_threads(7, 3), 3);
        assert_eq!(effective_threads(7, 70), 7);
    }

    #[test]
    fn plan_is_deterministic() {
        assert_eq!(PartitionPlan::new(3798, 99), PartitionPlan::new(3798, 99));
    }
}
