//! Derived performance metrics.
//!
//! A dense `n x n` product performs `n³` multiplications and `n³`
//! additions, so throughput is modelled as `2·n³` floating-point
//! operations:
//!
//! ```text
//! MFLOPS     = 2·n³ / (seconds · 1e6)
//! speedup    = T_sequential / T_parallel
//! efficiency = speedup / threads
//! ```
//!
//! Zero denominators yield `f64::INFINITY` instead of panicking.

use serde::Serialize;

/// Number of floating-point operations of an `n x n` product.
pub fn flop_count(n: usize) -> f64 {
    let n = n as f64;
    2.0 * n * n * n
}

/// Throughput in millions of floating-point operations per second.
pub fn mflops(n: usize, elapsed_secs: f64) -> f64 {
    if elapsed_secs == 0.0 {
        return f64::INFINITY;
    }
    flop_count(n) / (elapsed_secs * 1.0e6)
}

/// Ratio of sequential to parallel time.
pub fn speedup(sequential_secs: f64, parallel_secs: f64) -> f64 {
    if parallel_secs == 0.0 {
        return f64::INFINITY;
    }
    sequential_secs / parallel_secs
}

/// Speedup normalized by the number of threads.
pub fn efficiency(speedup: f64, threads: usize) -> f64 {
    speedup / threads.max(1) as f64
}

/// Throughput, speedup and efficiency of one measured run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerfMetrics {
    pub mflops: f64,
    pub speedup: f64,
    pub efficiency: f64,
}

impl PerfMetrics {
    /// Metrics of a sequential run, which is its own reference.
    pub fn sequential(n: usize, elapsed_secs: f64) -> Self {
        Self {
            mflops: mflops(n, elapsed_secs),
            speedup: 1.0,
            efficiency: 1.0,
        }
    }

    /// Metrics of a parallel run compared against a sequential reference.
    pub fn compare(n: usize, sequential_secs: f64, parallel_secs: f64, threads: usize) -> Self {
        let speedup = speedup(sequential_secs, parallel_secs);
        Self {
            mflops: mflops(n, parallel_secs),
            speedup,
            efficiency: efficiency(speedup, threads),
        }
    }

    /// Efficiency above one means the parallel run beat linear scaling,
    /// which points at a measurement problem rather than a real result.
    pub fn is_anomalous(&self) -> bool {
        self.efficiency > 1.0 || self.efficiency.is_nan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flop_count() {
        assert_eq!(flop_count(0), 0.0);
        assert_eq!(flop_count(10), 2000.0);
    }

    #[test]
    fn test_mflops() {
        // 2 * 100^3 = 2e6 flops in one second
        assert!((mflops(100, 1.0) - 2.0).abs() < 1e-12);
        assert!((mflops(100, 0.5) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_elapsed_is_infinite() {
        assert_eq!(mflops(64, 0.0), f64::INFINITY);
        assert_eq!(speedup(1.0, 0.0), f64::INFINITY);
        let metrics = PerfMetrics::compare(64, 1.0, 0.0, 4);
        assert_eq!(metrics.efficiency, f64::INFINITY);
        assert!(metrics.is_anomalous());
    }

    #[test]
    fn test_compare_metrics() {
        let metrics = PerfMetrics::compare(100, 4.0, 1.0, 8);
        assert_eq!(metrics.speedup, 4.0);
        assert_eq!(metrics.efficiency, 0.5);
        assert!((metrics.mflops - 2.0).abs() < 1e-12);
        assert!(!metrics.is_anomalous());
    }

    #[test]
    fn test_superlinear_efficiency_is_flagged() {
        let metrics = PerfMetrics::compare(100, 10.0, 1.0, 4);
        assert_eq!(metrics.efficiency, 2.5);
        assert!(metrics.is_anomalous());
    }

    #[test]
    fn test_sequential_metrics() {
        let metrics = PerfMetrics::sequential(100, 2.0);
        assert_eq!(metrics.speedup, 1.0);
        assert_eq!(metrics.efficiency, 1.0);
        assert!(!metrics.is_anomalous());
    }

    #[test]
    fn test_efficiency_with_zero_threads_does_not_divide_by_zero() {
        assert_eq!(efficiency(2.0, 0), 2.0);
    }
}
