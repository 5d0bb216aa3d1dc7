//! Persistent worker pool for filling sample buffers.
//!
//! The pool is a table of slots indexed like the ranges of a
//! [`PartitionPlan`]. Each occupied slot owns one long-lived thread with
//! its own job and completion channels, so a worker started on the first
//! call is reused by every later call that dispatches into the same slot.
//!
//! A worker never sees the caller's buffer. It fills a private chunk for
//! its range and hands it back; the orchestrator copies the chunk into
//! `buffer[range]` when it joins the slot. Ranges never overlap, so no
//! lock is taken on the buffer.
//!
//! # Slot lifecycle
//!
//! ```text
//! Empty --dispatch--> Running --join--> Joined --dispatch--> Running ...
//! ```
//!
//! Joining an `Empty` or `Joined` slot does nothing. Changing the configured
//! worker count shuts down and joins every existing worker before the
//! table is rebuilt, so shrinking the pool never leaves a thread behind.

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};
use std::ops::Range;
use std::thread;

use crate::error::{Error, Result};
use crate::monte_carlo::{Sample, SampleGenerator};
use crate::partition::PartitionPlan;

/// Where a slot is in its dispatch/join cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No worker has been started in this slot since the last reset.
    Empty,
    /// A range was handed to the slot's worker and not yet joined.
    Running,
    /// The last range was joined; the worker is idle and reusable.
    Joined,
}

struct Job {
    range: Range<usize>,
    #[cfg(test)]
    crash: bool,
}

impl Job {
    fn new(range: Range<usize>) -> Self {
        Job {
            range,
            #[cfg(test)]
            crash: false,
        }
    }
}

/// Failures the tests can inject into the next dispatch.
#[cfg(test)]
#[derive(Default)]
struct Faults {
    crash_slot: Option<usize>,
    refuse_spawn_slot: Option<usize>,
}

struct Completion {
    range: Range<usize>,
    samples: Vec<Sample>,
}

struct Worker {
    job_tx: Sender<Job>,
    done_rx: Receiver<Completion>,
    handle: thread::JoinHandle<()>,
}

impl Worker {
    fn spawn(slot: usize) -> Result<Self> {
        let (job_tx, job_rx) = bounded::<Job>(1);
        let (done_tx, done_rx) = bounded::<Completion>(1);

        let handle = thread::Builder::new()
            .name(format!("sampler-worker-{}", slot))
            .spawn(move || worker_loop(job_rx, done_tx))
            .map_err(|source| Error::Spawn { slot, source })?;

        Ok(Worker {
            job_tx,
            done_rx,
            handle,
        })
    }

    fn shutdown(self) {
        let Worker {
            job_tx,
            done_rx,
            handle,
        } = self;
        // Closing both channels ends the loop whether the worker is idle or
        // about to report.
        drop(job_tx);
        drop(done_rx);
        let _ = handle.join();
    }
}

/// Body of every worker thread: one generator for the thread's lifetime,
/// one chunk per job, until the pool hangs up.
fn worker_loop(jobs: Receiver<Job>, done: Sender<Completion>) {
    let mut generator = SampleGenerator::from_entropy();

    for job in jobs.iter() {
        #[cfg(test)]
        if job.crash {
            panic!("worker crashed on range {:?}", job.range);
        }

        let len = job.range.len();
        let mut samples = vec![Sample::default(); len];
        generator.fill(&mut samples, 0..len);

        if done
            .send(Completion {
                range: job.range,
                samples,
            })
            .is_err()
        {
            break;
        }
    }
}

struct Slot {
    state: SlotState,
    worker: Option<Worker>,
}

impl Slot {
    fn empty() -> Self {
        Slot {
            state: SlotState::Empty,
            worker: None,
        }
    }
}

/// Reusable set of sampling workers owned by one session.
pub struct WorkerPool {
    configured: Option<usize>,
    slots: Vec<Slot>,
    resets: usize,
    spawned: usize,
    #[cfg(test)]
    faults: Faults,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool {
    /// Creates an unconfigured pool with no workers.
    pub fn new() -> Self {
        WorkerPool {
            configured: None,
            slots: Vec::new(),
            resets: 0,
            spawned: 0,
            #[cfg(test)]
            faults: Faults::default(),
        }
    }

    /// The worker count set by the last [`configure`](Self::configure) call.
    pub fn configured_threads(&self) -> Option<usize> {
        self.configured
    }

    /// Sets the worker count.
    ///
    /// Asking for the current count leaves the pool untouched and returns
    /// `false`. Any other count joins and discards every worker, clears the
    /// slot table and returns `true`; slots are refilled on the next dispatch.
    pub fn configure(&mut self, num_threads: usize) -> bool {
        if self.configured == Some(num_threads) {
            debug!("Worker count unchanged at {}; keeping pool", num_threads);
            return false;
        }

        match self.configured {
            Some(previous) => info!(
                "Worker count changed from {} to {}; rebuilding pool",
                previous, num_threads
            ),
            None => info!("Initialising worker pool with {} workers", num_threads),
        }

        self.teardown();
        self.configured = Some(num_threads);
        self.resets += 1;
        true
    }

    /// Hands every range of `plan` to the worker in the slot with the same
    /// index, spawning or replacing workers as needed.
    ///
    /// On error, ranges already handed out stay `Running`; callers should
    /// [`discard_pending`](Self::discard_pending) before giving up.
    pub fn dispatch(&mut self, plan: &PartitionPlan) -> Result<()> {
        if self.slots.len() < plan.len() {
            self.slots.resize_with(plan.len(), Slot::empty);
        }

        for (slot, range) in plan.ranges().iter().enumerate() {
            if self.slots[slot].state == SlotState::Running {
                warn!("Slot {} still running from an earlier dispatch; discarding it", slot);
                self.discard_slot(slot);
            }

            let worker = match self.slots[slot].worker.take() {
                Some(worker) => {
                    debug!("Reusing worker in slot {}", slot);
                    worker
                }
                None => self.spawn_worker(slot)?,
            };

            // A worker that has exited dropped its job receiver, so the send
            // fails and the slot gets a fresh thread.
            let worker = match worker.job_tx.send(self.job_for(slot, range.clone())) {
                Ok(()) => worker,
                Err(returned) => {
                    warn!("Worker in slot {} has exited; replacing it", slot);
                    worker.shutdown();
                    let fresh = self.spawn_worker(slot)?;
                    fresh
                        .job_tx
                        .send(returned.into_inner())
                        .map_err(|_| Error::WorkerLost { slot })?;
                    fresh
                }
            };

            let entry = &mut self.slots[slot];
            entry.worker = Some(worker);
            entry.state = SlotState::Running;
        }

        Ok(())
    }

    /// Waits for the worker in `slot` and copies its samples into `buffer`.
    ///
    /// Returns `Ok(false)` without blocking when the slot is `Empty`,
    /// already `Joined`, or out of range.
    pub fn join_slot(&mut self, slot: usize, buffer: &mut [Sample]) -> Result<bool> {
        match self.receive(slot)? {
            Some(done) => {
                buffer[done.range].copy_from_slice(&done.samples);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Joins every `Running` slot into `buffer`.
    ///
    /// All slots are joined even when one fails; the first failure is
    /// returned and the buffer must then be thrown away.
    pub fn join_all(&mut self, buffer: &mut [Sample]) -> Result<()> {
        let mut first_error = None;
        for slot in 0..self.slots.len() {
            if let Err(err) = self.join_slot(slot, buffer) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Waits for every `Running` slot and drops what it produced.
    pub fn discard_pending(&mut self) {
        for slot in 0..self.slots.len() {
            self.discard_slot(slot);
        }
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.slots
            .get(slot)
            .map_or(SlotState::Empty, |entry| entry.state)
    }

    /// Number of slots holding a worker thread.
    pub fn live_workers(&self) -> usize {
        self.slots.iter().filter(|s| s.worker.is_some()).count()
    }

    /// How many times the pool was (re)built by `configure`.
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Worker threads started over the pool's lifetime.
    pub fn workers_spawned(&self) -> usize {
        self.spawned
    }

    #[cfg(not(test))]
    fn job_for(&mut self, _slot: usize, range: Range<usize>) -> Job {
        Job::new(range)
    }

    #[cfg(test)]
    fn job_for(&mut self, slot: usize, range: Range<usize>) -> Job {
        let mut job = Job::new(range);
        if self.faults.crash_slot == Some(slot) {
            self.faults.crash_slot = None;
            job.crash = true;
        }
        job
    }

    /// Makes the worker that receives the next job for `slot` panic.
    #[cfg(test)]
    pub(crate) fn crash_next_job(&mut self, slot: usize) {
        self.faults.crash_slot = Some(slot);
    }

    /// Makes the next attempt to start a worker for `slot` fail.
    #[cfg(test)]
    pub(crate) fn refuse_next_spawn(&mut self, slot: usize) {
        self.faults.refuse_spawn_slot = Some(slot);
    }

    fn spawn_worker(&mut self, slot: usize) -> Result<Worker> {
        #[cfg(test)]
        if self.faults.refuse_spawn_slot == Some(slot) {
            self.faults.refuse_spawn_slot = None;
            return Err(Error::Spawn {
                slot,
                source: std::io::Error::other("spawn refused"),
            });
        }

        let worker = Worker::spawn(slot)?;
        self.spawned += 1;
        debug!("Spawned worker for slot {}", slot);
        Ok(worker)
    }

    fn receive(&mut self, slot: usize) -> Result<Option<Completion>> {
        let Some(entry) = self.slots.get_mut(slot) else {
            return Ok(None);
        };
        if entry.state != SlotState::Running {
            return Ok(None);
        }

        let received = entry.worker.as_ref().map(|w| w.done_rx.recv());
        match received {
            Some(Ok(done)) => {
                entry.state = SlotState::Joined;
                Ok(Some(done))
            }
            _ => {
                warn!("Worker in slot {} exited before reporting", slot);
                if let Some(dead) = entry.worker.take() {
                    dead.shutdown();
                }
                entry.state = SlotState::Empty;
                Err(Error::WorkerLost { slot })
            }
        }
    }

    fn discard_slot(&mut self, slot: usize) {
        let _ = self.receive(slot);
    }

    fn teardown(&mut self) {
        let live = self.live_workers();
        for slot in self.slots.drain(..) {
            if let Some(worker) = slot.worker {
                worker.shutdown();
            }
        }
        if live > 0 {
            debug!("Joined {} workers", live);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let live = self.live_workers();
        self.teardown();
        if live > 0 {
            info!("Worker pool shut down ({} workers joined)", live);
        }
    }
}
