//! Dense matrix multiplication benchmark.
//!
//! `cachebench` times five square `f64` matrix multiplication kernels that
//! differ only in loop order, blocking, or parallel decomposition, and
//! pairs every run with hardware cache-miss counters so the effect of the
//! memory-access pattern can be read directly from the results.
//!
//! ```no_run
//! use cachebench::{open_hardware_counters, ConsoleSink, Driver, ExperimentConfig, KernelKind};
//!
//! let config = ExperimentConfig::single(KernelKind::Line, vec![600, 1000], 256);
//! let mut driver = Driver::new(open_hardware_counters(), ConsoleSink::stdout());
//! let summary = driver.run(&config)?;
//! println!("{} records", summary.records);
//! # Ok::<(), cachebench::BenchError>(())
//! ```

pub mod config;
pub mod counters;
pub mod driver;
pub mod error;
pub mod kernels;
pub mod matrix;
pub mod metrics;
pub mod record;
pub mod sink;
pub mod timing;

pub use config::{ExperimentConfig, SweepEntry};
pub use counters::{open_hardware_counters, CounterSample, CounterSession, UnavailableCounters};
pub use driver::{parallel_report, Driver, ParallelReport, SweepState, SweepSummary};
pub use error::{BenchError, CounterError, Result};
pub use kernels::{BlockDecomposition, Kernel, KernelKind, KernelRun};
pub use matrix::{Matrix, Operands};
pub use metrics::PerfMetrics;
pub use record::ResultRecord;
pub use sink::{ConsoleSink, CsvSink, JsonLinesSink, RecordSink};
