//! Hardware cache-miss counter sessions.
//!
//! A session brackets one kernel invocation: `start` arms the event set,
//! `stop` disarms it and hands back one value per event, and `reset` zeroes
//! the counts so the next invocation starts clean. Exactly two events are
//! tracked, in a fixed order:
//!
//! | Index | Name | Linux event |
//! |-------|------|-------------|
//! | 0 | `L1_DCM` | L1 data cache read misses |
//! | 1 | `L2_DCM` | last-level cache read misses |
//!
//! Counters are best-effort. When the backend cannot be opened (non-Linux
//! targets, `perf_event_paranoid` restrictions, virtualized PMUs), callers
//! get an [`UnavailableCounters`] session instead and the benchmark still
//! runs with zeroed counts.

#[cfg(target_os = "linux")]
mod perf;

use serde::Serialize;
use tracing::debug;

use crate::error::CounterError;

#[cfg(target_os = "linux")]
pub use perf::PerfCounters;

/// Event names, in the order their values appear in a [`CounterSample`].
pub const EVENT_NAMES: [&str; 2] = ["L1_DCM", "L2_DCM"];

/// Counter values read at the end of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSample {
    pub l1_misses: u64,
    pub l2_misses: u64,
}

impl CounterSample {
    /// The sample reported when counters are unavailable.
    pub const ZERO: CounterSample = CounterSample {
        l1_misses: 0,
        l2_misses: 0,
    };

    pub fn from_array(values: [u64; 2]) -> Self {
        Self {
            l1_misses: values[0],
            l2_misses: values[1],
        }
    }

    pub fn as_array(&self) -> [u64; 2] {
        [self.l1_misses, self.l2_misses]
    }
}

/// A start/stop/reset cycle over the two tracked events.
pub trait CounterSession {
    /// Whether the session measures anything at all.
    fn is_available(&self) -> bool;

    /// Arms the event set. Counts accumulate until [`stop`](Self::stop).
    fn start(&mut self) -> Result<(), CounterError>;

    /// Disarms the event set and returns the accumulated counts.
    fn stop(&mut self) -> Result<CounterSample, CounterError>;

    /// Zeroes the counts without changing whether the set is armed.
    fn reset(&mut self) -> Result<(), CounterError>;
}

impl<T: CounterSession + ?Sized> CounterSession for Box<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn start(&mut self) -> Result<(), CounterError> {
        (**self).start()
    }

    fn stop(&mut self) -> Result<CounterSample, CounterError> {
        (**self).stop()
    }

    fn reset(&mut self) -> Result<(), CounterError> {
        (**self).reset()
    }
}

/// A session with no backend. Every operation reports why.
#[derive(Debug, Clone)]
pub struct UnavailableCounters {
    reason: String,
}

impl UnavailableCounters {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn error(&self) -> CounterError {
        CounterError::Unavailable {
            reason: self.reason.clone(),
        }
    }
}

impl CounterSession for UnavailableCounters {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), CounterError> {
        Err(self.error())
    }

    fn stop(&mut self) -> Result<CounterSample, CounterError> {
        Err(self.error())
    }

    fn reset(&mut self) -> Result<(), CounterError> {
        Err(self.error())
    }
}

/// Opens the platform counter backend, falling back to
/// [`UnavailableCounters`] when it cannot be used.
pub fn open_hardware_counters() -> Box<dyn CounterSession> {
    #[cfg(target_os = "linux")]
    {
        match PerfCounters::open() {
            Ok(counters) => {
                debug!(events = ?EVENT_NAMES, "Opened perf_event counter group");
                Box::new(counters)
            }
            Err(e) => {
                debug!(error = %e, "Could not open perf_event counter group");
                Box::new(UnavailableCounters::new(e.to_string()))
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let reason = "hardware counters are only supported on Linux";
        debug!("{reason}");
        Box::new(UnavailableCounters::new(reason))
    }
}
