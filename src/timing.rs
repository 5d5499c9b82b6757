//! Monotonic wall-clock measurement.

use std::time::{Duration, Instant};

/// A started monotonic stopwatch.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    /// Starts measuring now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

/// Runs `f` and returns its output together with the elapsed seconds.
pub fn time_secs<R>(f: impl FnOnce() -> R) -> (R, f64) {
    let stopwatch = Stopwatch::start();
    let out = f();
    (out, stopwatch.elapsed_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwatch_is_monotonic() {
        let stopwatch = Stopwatch::start();
        let first = stopwatch.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        let second = stopwatch.elapsed();
        assert!(second >= first);
        assert!(second >= Duration::from_millis(2));
    }

    #[test]
    fn test_time_secs_returns_output() {
        let (value, secs) = time_secs(|| 6 * 7);
        assert_eq!(value, 42);
        assert!(secs >= 0.0);
    }
}
