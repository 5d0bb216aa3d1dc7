use std::thread;

/// Number of workers the platform suggests running in parallel; 1 when it cannot tell.
pub fn available_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_one_worker() {
        assert!(available_workers() >= 1);
    }
}
