//! Multi-threaded generation of unit-circle Monte Carlo samples.
//!
//! A [`SamplingSession`] splits each request into balanced index ranges,
//! hands them to a persistent [`WorkerPool`] and returns the filled buffer
//! once every worker has reported.

pub mod config;
pub mod error;
pub mod hardware;
pub mod monte_carlo;
pub mod partition;
pub mod pool;
pub mod session;

pub use error::{Error, Result};
pub use hardware::available_workers;
pub use monte_carlo::{Sample, SampleGenerator, Tally};
pub use partition::{effective_threads, PartitionPlan};
pub use pool::{SlotState, WorkerPool};
pub use session::SamplingSession;
