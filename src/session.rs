//! Sampling orchestration on top of a reusable [`WorkerPool`].

use log::debug;

use crate::error::{Error, Result};
use crate::monte_carlo::Sample;
use crate::partition::{effective_threads, PartitionPlan};
use crate::pool::WorkerPool;

/// Owns a worker pool and turns `(num_points, num_threads)` requests into
/// filled sample buffers.
///
/// The pool's workers outlive individual calls and are only rebuilt when
/// the requested thread count changes. Dropping the session joins them.
#[derive(Default)]
pub struct SamplingSession {
    pool: WorkerPool,
    last_request: Option<(usize, i64)>,
    effective_threads: Option<usize>,
}

impl SamplingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pool size. Returns whether the pool was rebuilt.
    ///
    /// Counts below 1 are treated as 1.
    pub fn configure_workers(&mut self, count: i64) -> bool {
        self.pool.configure(effective_threads(usize::MAX, count))
    }

    /// Draws `num_points` samples using up to `num_threads` workers.
    ///
    /// A negative point count, or one too large to allocate, fails before
    /// the pool is touched. The thread count is clamped to `[1, max(num_points, 1)]`;
    /// the value used is available from [`effective_threads`](Self::effective_threads).
    pub fn sample(&mut self, num_points: i64, num_threads: i64) -> Result<Vec<Sample>> {
        let num_points = usize::try_from(num_points).map_err(|_| Error::InvalidPointCount {
            requested: num_points,
        })?;
        self.step(num_points, num_threads)
    }

    /// One dispatch/join cycle for an already validated point count.
    pub fn step(&mut self, num_points: usize, num_threads: i64) -> Result<Vec<Sample>> {
        if self.last_request != Some((num_points, num_threads)) {
            debug!(
                "Sampling request changed: num_points={} num_threads={}",
                num_points, num_threads
            );
            self.last_request = Some((num_points, num_threads));
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(num_points)
            .map_err(|_| Error::Allocation {
                requested: num_points,
            })?;
        buffer.resize(num_points, Sample::default());

        let requested = effective_threads(usize::MAX, num_threads);
        if self.pool.configured_threads() != Some(requested) {
            self.pool.configure(requested);
        }

        let effective = effective_threads(num_points, num_threads);
        if effective < requested {
            debug!(
                "Clamped {} requested workers to {} for {} points",
                requested, effective, num_points
            );
        }
        self.effective_threads = Some(effective);

        let plan = PartitionPlan::new(num_points, num_threads);
        if plan.is_empty() {
            return Ok(buffer);
        }

        if let Err(err) = self.pool.dispatch(&plan) {
            self.pool.discard_pending();
            return Err(err);
        }
        self.pool.join_all(&mut buffer)?;

        Ok(buffer)
    }

    /// Worker count used by the most recent `sample`/`step` call.
    pub fn effective_threads(&self) -> Option<usize> {
        self.effective_threads
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SlotState;

    #[test]
    fn negative_points_rejected_before_configuring() {
        let mut session = SamplingSession::new();
        let err = session.sample(-5, 4).unwrap_err();

        assert!(matches!(err, Error::InvalidPointCount { requested: -5 }));
        assert_eq!(session.pool().configured_threads(), None);
        assert_eq!(session.pool().workers_spawned(), 0);
        assert_eq!(session.effective_threads(), None);
    }

    #[test]
    fn zero_points_dispatches_nothing() {
        let mut session = SamplingSession::new();
        let samples = session.sample(0, 4).unwrap();

        assert!(samples.is_empty());
        assert_eq!(session.effective_threads(), Some(1));
        assert_eq!(session.pool().workers_spawned(), 0);
    }

    #[test]
    fn same_thread_count_skips_configuration() {
        let mut session = SamplingSession::new();

        assert_eq!(session.sample(1000, 4).unwrap().len(), 1000);
        assert_eq!(session.sample(1000, 4).unwrap().len(), 1000);

        assert_eq!(session.pool().resets(), 1);
        assert_eq!(session.pool().workers_spawned(), 4);
    }

    #[test]
    fn fewer_points_than_threads_keeps_pool() {
        let mut session = SamplingSession::new();
        session.sample(100, 4).unwrap();
        let samples = session.sample(2, 4).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(session.effective_threads(), Some(2));
        assert_eq!(session.pool().configured_threads(), Some(4));
        assert_eq!(session.pool().resets(), 1);
    }

    #[test]
    fn configure_workers_normalises_count() {
        let mut session = SamplingSession::new();
        assert!(session.configure_workers(-3));
        assert_eq!(session.pool().configured_threads(), Some(1));
        assert!(!session.configure_workers(0));
        assert!(session.configure_workers(3));
    }

    #[test]
    fn oversized_request_fails_without_touching_pool() {
        let mut session = SamplingSession::new();
        let err = session.sample(i64::MAX, 2).unwrap_err();

        assert!(matches!(err, Error::Allocation { .. }));
        assert_eq!(session.pool().configured_threads(), None);
        assert_eq!(session.pool().workers_spawned(), 0);
        assert_eq!(session.effective_threads(), None);

        assert_eq!(session.sample(20, 2).unwrap().len(), 20);
    }

    #[test]
    fn lost_worker_fails_call_and_is_replaced() {
        let mut session = SamplingSession::new();
        session.sample(300, 3).unwrap();

        session.pool.crash_next_job(1);
        let err = session.sample(300, 3).unwrap_err();
        assert!(matches!(err, Error::WorkerLost { slot: 1 }));
        assert_eq!(session.pool().slot_state(0), SlotState::Joined);
        assert_eq!(session.pool().slot_state(1), SlotState::Empty);
        assert_eq!(session.pool().slot_state(2), SlotState::Joined);

        let samples = session.sample(300, 3).unwrap();
        assert_eq!(samples.len(), 300);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(&s.x)));
        assert_eq!(session.pool().workers_spawned(), 4);
        assert_eq!(session.pool().live_workers(), 3);
        assert_eq!(session.pool().resets(), 1);
    }

    #[test]
    fn failed_dispatch_drains_started_workers() {
        let mut session = SamplingSession::new();

        session.pool.refuse_next_spawn(2);
        let err = session.sample(30, 3).unwrap_err();
        assert!(matches!(err, Error::Spawn { slot: 2, .. }));
        assert_eq!(session.pool().slot_state(0), SlotState::Joined);
        assert_eq!(session.pool().slot_state(1), SlotState::Joined);
        assert_eq!(session.pool().slot_state(2), SlotState::Empty);

        assert_eq!(session.sample(30, 3).unwrap().len(), 30);
        assert_eq!(session.pool().live_workers(), 3);
    }
}
