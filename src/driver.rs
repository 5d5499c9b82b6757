//! Benchmark orchestration.
//!
//! The [`Driver`] walks a sweep plan and, for every entry, brackets one
//! kernel invocation with a counter session and a stopwatch, derives the
//! metrics and hands one [`ResultRecord`] to the sink.
//!
//! Each entry moves through a fixed sequence of states:
//!
//! ```text
//! Idle -> CounterArmed -> KernelRunning -> CounterDrained -> RecordEmitted -> Idle
//! ```
//!
//! `CounterArmed` is skipped when counters are unavailable. Counter
//! failures never abort a sweep: the first failure switches the driver to
//! degraded mode, is logged once, and every later record carries zero
//! counts. Allocation failures and sink errors do abort, and reach the
//! caller as values.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ExperimentConfig, SweepEntry};
use crate::counters::{CounterSample, CounterSession};
use crate::error::{CounterError, Result};
use crate::kernels::Kernel;
use crate::matrix::{Operands, PREVIEW_LEN};
use crate::metrics::PerfMetrics;
use crate::record::ResultRecord;
use crate::sink::RecordSink;

/// Where the driver is within one sweep entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SweepState {
    Idle,
    CounterArmed,
    KernelRunning,
    CounterDrained,
    RecordEmitted,
}

impl SweepState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: SweepState) -> bool {
        use SweepState::*;
        matches!(
            (self, next),
            (Idle, CounterArmed)
                | (Idle, KernelRunning)
                | (CounterArmed, KernelRunning)
                | (KernelRunning, CounterDrained)
                | (CounterDrained, RecordEmitted)
                | (RecordEmitted, Idle)
        )
    }
}

/// Outcome of a full sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of records emitted.
    pub records: usize,
    /// Whether counters were unavailable or failed at any point.
    pub counters_degraded: bool,
}

impl SweepSummary {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Sequential versus parallel timing for one matrix size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelReport {
    pub algorithm: String,
    pub size: usize,
    pub threads: usize,
    pub sequential_secs: f64,
    pub parallel_secs: f64,
    pub metrics: PerfMetrics,
}

impl fmt::Display for ParallelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (N = {}, {} threads)", self.algorithm, self.size, self.threads)?;
        writeln!(f, "  Sequential time: {:.3} s", self.sequential_secs)?;
        writeln!(f, "  Parallel time:   {:.3} s", self.parallel_secs)?;
        writeln!(f, "  Speedup:         {:.2}", self.metrics.speedup)?;
        writeln!(f, "  Efficiency:      {:.2}", self.metrics.efficiency)?;
        write!(f, "  MFLOPS:          {:.2}", self.metrics.mflops)
    }
}

/// Times the sequential Line kernel against both parallel variants
/// on the current pool. Counters are not involved.
pub fn parallel_report(n: usize) -> Result<Vec<ParallelReport>> {
    let sequential = Kernel::Line.run(n)?;
    [Kernel::LineExtParallel, Kernel::LineIntParallel]
        .into_iter()
        .map(|kernel| {
            let parallel = kernel.run(n)?;
            let threads = kernel.threads();
            Ok(ParallelReport {
                algorithm: kernel.name(),
                size: n,
                threads,
                sequential_secs: sequential.elapsed_secs,
                parallel_secs: parallel.elapsed_secs,
                metrics: PerfMetrics::compare(
                    n,
                    sequential.elapsed_secs,
                    parallel.elapsed_secs,
                    threads,
                ),
            })
        })
        .collect()
}

/// Most states one entry can visit, `Idle` at both ends included.
const ENTRY_TRACE_LEN: usize = 6;

/// Runs sweep entries against a counter session and a record sink.
pub struct Driver<C, S> {
    counters: C,
    sink: S,
    degraded: bool,
    state: SweepState,
    transitions: Vec<SweepState>,
}

impl<C: CounterSession, S: RecordSink> Driver<C, S> {
    /// Builds a driver. An unavailable session puts it in degraded mode
    /// from the start.
    pub fn new(counters: C, sink: S) -> Self {
        let degraded = !counters.is_available();
        if degraded {
            warn!("Hardware counters unavailable, L1/L2 values will be reported as 0");
        }
        Self {
            counters,
            sink,
            degraded,
            state: SweepState::Idle,
            transitions: {
                let mut trace = Vec::with_capacity(ENTRY_TRACE_LEN);
                trace.push(SweepState::Idle);
                trace
            },
        }
    }

    /// Whether counter values are currently being zero-filled.
    pub fn counters_degraded(&self) -> bool {
        self.degraded
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    /// States visited by the most recent entry, starting with `Idle`.
    pub fn transitions(&self) -> &[SweepState] {
        &self.transitions
    }

    pub fn counters(&self) -> &C {
        &self.counters
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (C, S) {
        (self.counters, self.sink)
    }

    /// Runs every entry of the configuration's plan, in order.
    pub fn run(&mut self, config: &ExperimentConfig) -> Result<SweepSummary> {
        let plan = config.plan()?;
        let started_at = Utc::now();
        info!(entries = plan.len(), "Starting sweep");

        for entry in &plan {
            self.run_entry(entry)?;
        }
        self.sink.flush()?;

        let summary = SweepSummary {
            started_at,
            finished_at: Utc::now(),
            records: plan.len(),
            counters_degraded: self.degraded,
        };
        info!(
            records = summary.records,
            seconds = summary.duration().num_milliseconds() as f64 / 1000.0,
            counters_degraded = summary.counters_degraded,
            "Sweep finished"
        );
        Ok(summary)
    }

    /// Runs one entry and emits its record.
    pub fn run_entry(&mut self, entry: &SweepEntry) -> Result<ResultRecord> {
        self.transitions.clear();
        self.transitions.push(SweepState::Idle);

        let n = entry.size;
        let kernel = entry.kernel;
        let decomposition = kernel.decomposition(n)?;

        // The sequential reference runs outside the counted window.
        let reference_secs = if kernel.is_parallel() {
            let reference = Kernel::Line.run(n)?;
            debug!(size = n, seconds = reference.elapsed_secs, "Sequential reference");
            Some(reference.elapsed_secs)
        } else {
            None
        };

        let mut operands = Operands::allocate(n)?;
        let threads = kernel.threads();

        let armed = !self.degraded && self.arm_counters();

        self.advance(SweepState::KernelRunning);
        let elapsed_secs = kernel.execute(&mut operands);

        let sample = if armed {
            self.drain_counters()
        } else {
            CounterSample::ZERO
        };
        self.advance(SweepState::CounterDrained);
        debug!(trace = ?self.transitions, "Counted window closed");

        let metrics = match reference_secs {
            Some(sequential) => PerfMetrics::compare(n, sequential, elapsed_secs, threads),
            None => PerfMetrics::sequential(n, elapsed_secs),
        };
        if metrics.is_anomalous() {
            warn!(
                algorithm = %entry.label,
                size = n,
                efficiency = metrics.efficiency,
                "Efficiency above 1.0, measurement is likely unreliable"
            );
        }

        let first_row = operands.output().first_row_preview(PREVIEW_LEN);
        drop(operands);

        let record = ResultRecord::new(
            entry.label.clone(),
            n,
            decomposition,
            elapsed_secs,
            sample,
            metrics,
            threads,
        )
        .with_first_row(first_row);
        debug!(
            algorithm = %record.algorithm,
            size = n,
            seconds = elapsed_secs,
            l1 = record.l1_misses,
            l2 = record.l2_misses,
            "Entry measured"
        );

        // The entry is finished once the sink has seen the record, whether
        // or not it accepted it.
        let emitted = self.sink.emit(&record);
        self.advance(SweepState::RecordEmitted);
        self.advance(SweepState::Idle);
        emitted?;
        Ok(record)
    }

    fn arm_counters(&mut self) -> bool {
        match self.counters.start() {
            Ok(()) => {
                self.advance(SweepState::CounterArmed);
                true
            }
            Err(e) => {
                self.degrade(&e);
                false
            }
        }
    }

    /// Stops and resets an armed session. Any failure degrades.
    fn drain_counters(&mut self) -> CounterSample {
        let sample = match self.counters.stop() {
            Ok(sample) => sample,
            Err(e) => {
                self.degrade(&e);
                return CounterSample::ZERO;
            }
        };
        if let Err(e) = self.counters.reset() {
            self.degrade(&e);
            return CounterSample::ZERO;
        }
        sample
    }

    fn degrade(&mut self, error: &CounterError) {
        if !self.degraded {
            warn!(error = %error, "Counter session failed, continuing with zeroed L1/L2 values");
            self.degraded = true;
        }
    }

    /// Moves to `next` without logging, so it is safe inside the counted
    /// window. The trace never grows past its preallocated capacity.
    fn advance(&mut self, next: SweepState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
        self.transitions.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::UnavailableCounters;
    use crate::kernels::KernelKind;

    /// Counts one "miss" per call, so samples are predictable.
    #[derive(Default)]
    struct TickCounters {
        running: bool,
        starts: u64,
        resets: u64,
    }

    impl CounterSession for TickCounters {
        fn is_available(&self) -> bool {
            true
        }

        fn start(&mut self) -> std::result::Result<(), CounterError> {
            self.running = true;
            self.starts += 1;
            Ok(())
        }

        fn stop(&mut self) -> std::result::Result<CounterSample, CounterError> {
            self.running = false;
            Ok(CounterSample::from_array([self.starts * 10, self.starts]))
        }

        fn reset(&mut self) -> std::result::Result<(), CounterError> {
            self.resets += 1;
            Ok(())
        }
    }

    #[test]
    fn test_state_machine_with_counters() {
        let mut driver = Driver::new(TickCounters::default(), Vec::<ResultRecord>::new());
        let record = driver.run_entry(&SweepEntry::new(Kernel::Line, 4)).unwrap();

        assert_eq!(
            driver.transitions(),
            &[
                SweepState::Idle,
                SweepState::CounterArmed,
                SweepState::KernelRunning,
                SweepState::CounterDrained,
                SweepState::RecordEmitted,
                SweepState::Idle,
            ]
        );
        assert_eq!(record.l1_misses, 10);
        assert_eq!(record.l2_misses, 1);
        assert_eq!(driver.counters().resets, 1);
        assert!(!driver.counters().running);
        assert!(!driver.counters_degraded());
    }

    #[test]
    fn test_unavailable_counters_skip_arming() {
        let mut driver = Driver::new(UnavailableCounters::new("test"), Vec::<ResultRecord>::new());
        assert!(driver.counters_degraded());
        driver.run_entry(&SweepEntry::new(Kernel::Standard, 3)).unwrap();
        assert_eq!(driver.transitions()[1], SweepState::KernelRunning);
        assert!(!driver.transitions().contains(&SweepState::CounterArmed));
        assert_eq!(driver.state(), SweepState::Idle);
    }

    #[test]
    fn test_parallel_entry_reports_threads_and_speedup() {
        let mut driver = Driver::new(UnavailableCounters::new("test"), Vec::<ResultRecord>::new());
        let record = driver
            .run_entry(&SweepEntry::new(Kernel::LineExtParallel, 16))
            .unwrap();
        assert_eq!(record.thread_count, crate::kernels::worker_threads());
        assert!(record.speedup > 0.0);
        assert!(record.first_row.iter().all(|&v| v == 136.0));
    }

    #[test]
    fn test_trace_covers_one_entry_without_growing() {
        let mut driver = Driver::new(TickCounters::default(), Vec::<ResultRecord>::new());
        let capacity = driver.transitions.capacity();
        assert!(capacity >= ENTRY_TRACE_LEN);

        for _ in 0..5 {
            driver.run_entry(&SweepEntry::new(Kernel::Line, 4)).unwrap();
            assert_eq!(driver.transitions().len(), ENTRY_TRACE_LEN);
            assert_eq!(driver.transitions.capacity(), capacity);
        }
        assert_eq!(driver.counters().starts, 5);
    }

    #[test]
    fn test_state_transition_table() {
        assert!(SweepState::Idle.can_advance_to(SweepState::CounterArmed));
        assert!(SweepState::Idle.can_advance_to(SweepState::KernelRunning));
        assert!(!SweepState::Idle.can_advance_to(SweepState::RecordEmitted));
        assert!(!SweepState::KernelRunning.can_advance_to(SweepState::Idle));
        assert!(SweepState::RecordEmitted.can_advance_to(SweepState::Idle));
    }

    #[test]
    fn test_run_returns_summary() {
        let config = ExperimentConfig::single(KernelKind::Block, vec![8, 12], 4);
        let mut driver = Driver::new(TickCounters::default(), Vec::<ResultRecord>::new());
        let summary = driver.run(&config).unwrap();
        assert_eq!(summary.records, 2);
        assert!(!summary.counters_degraded);
        assert!(summary.finished_at >= summary.started_at);

        let (_, records) = driver.into_parts();
        assert_eq!(records[0].algorithm, "Block_4");
        assert_eq!(records[0].num_blocks, 8);
        assert_eq!(records[1].num_blocks, 27);
    }

    #[test]
    fn test_parallel_report() {
        let reports = parallel_report(16).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].algorithm, "LineExtParallel");
        assert_eq!(reports[1].algorithm, "LineIntParallel");
        assert!(reports[0].to_string().contains("Speedup:"));
    }
}
