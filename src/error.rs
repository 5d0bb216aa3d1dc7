//! Errors for the sampling engine.

/// Errors surfaced by the sampler, its worker pool and the run configuration.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A negative number of points was requested.
    #[error("Invalid point count: {requested}. Point count must not be negative.")]
    InvalidPointCount {
        /// The rejected point count.
        requested: i64,
    },

    /// The sample buffer for this many points could not be allocated.
    #[error("Cannot allocate a buffer for {requested} samples")]
    Allocation {
        /// The requested point count.
        requested: usize,
    },

    /// The OS refused to start a worker thread.
    #[error("Failed to spawn worker thread for slot {slot}: {source}")]
    Spawn {
        /// Slot the worker was meant to occupy.
        slot: usize,
        /// Underlying spawn failure.
        source: std::io::Error,
    },

    /// A worker stopped before reporting its range.
    #[error("Worker in slot {slot} exited before completing its range")]
    WorkerLost {
        /// Slot whose worker disappeared.
        slot: usize,
    },

    /// The run configuration could not be parsed.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong with it.
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
