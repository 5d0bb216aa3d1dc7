//! Command-line configuration for the sampler binary.

use crate::error::{Error, Result};
use crate::hardware;

/// Environment variable consulted when no thread count is passed.
pub const THREADS_ENV: &str = "CIRCLE_SAMPLER_THREADS";

const DEFAULT_BATCHES: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Points drawn per batch.
    pub points: i64,
    /// Requested workers; clamped by the session.
    pub threads: i64,
    pub batches: usize,
}

impl RunConfig {
    /// Parses `<points> [threads] [batches]` (program name excluded).
    pub fn from_args(args: &[String]) -> Result<Self> {
        Self::parse(args, std::env::var(THREADS_ENV).ok())
    }

    fn parse(args: &[String], env_threads: Option<String>) -> Result<Self> {
        let points = match args.first() {
            Some(raw) => parse_field::<i64>("points", raw)?,
            None => return Err(invalid("missing number of points")),
        };
        if points < 0 {
            return Err(invalid(format!("points must not be negative, got {}", points)));
        }

        let threads = match args.get(1).cloned().or(env_threads) {
            Some(raw) => parse_field::<i64>("threads", &raw)?,
            None => hardware::available_workers() as i64,
        };

        let batches = match args.get(2) {
            Some(raw) => parse_field::<usize>("batches", raw)?,
            None => DEFAULT_BATCHES,
        };
        if batches == 0 {
            return Err(invalid("batches must be at least 1"));
        }

        if args.len() > 3 {
            return Err(invalid(format!("unexpected argument '{}'", args[3])));
        }

        Ok(RunConfig {
            points,
            threads,
            batches,
        })
    }
}

fn parse_field<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(format!("{} must be an integer, got '{}'", name, raw)))
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfig {
        message: message.into(),
    }
}
