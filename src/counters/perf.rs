//! `perf_event` backend for Linux.
//!
//! Both events live in one group so they are enabled, disabled and read
//! atomically. Only the calling thread is counted: the group is opened
//! without `inherit`, so worker threads spawned by a parallel kernel are
//! not included in the totals.

use perf_event::events::{Cache, CacheOp, CacheResult, WhichCache};
use perf_event::{Builder, Counter, Group};

use super::{CounterSample, CounterSession, EVENT_NAMES};
use crate::error::CounterError;

/// L1 data cache and last-level cache read misses.
pub struct PerfCounters {
    group: Group,
    l1: Counter,
    l2: Counter,
}

fn read_misses(which: WhichCache) -> Cache {
    Cache {
        which,
        operation: CacheOp::READ,
        result: CacheResult::MISS,
    }
}

impl PerfCounters {
    /// Opens the group and registers both events.
    pub fn open() -> Result<Self, CounterError> {
        let mut group = Group::new().map_err(|source| CounterError::Register {
            event: "group",
            source,
        })?;
        let l1 = Builder::new()
            .group(&mut group)
            .kind(read_misses(WhichCache::L1D))
            .build()
            .map_err(|source| CounterError::Register {
                event: EVENT_NAMES[0],
                source,
            })?;
        let l2 = Builder::new()
            .group(&mut group)
            .kind(read_misses(WhichCache::LL))
            .build()
            .map_err(|source| CounterError::Register {
                event: EVENT_NAMES[1],
                source,
            })?;
        Ok(Self { group, l1, l2 })
    }
}

impl CounterSession for PerfCounters {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self) -> Result<(), CounterError> {
        self.group.enable().map_err(CounterError::Start)
    }

    fn stop(&mut self) -> Result<CounterSample, CounterError> {
        self.group.disable().map_err(CounterError::Stop)?;
        let counts = self.group.read().map_err(CounterError::Stop)?;
        Ok(CounterSample {
            l1_misses: counts[&self.l1],
            l2_misses: counts[&self.l2],
        })
    }

    fn reset(&mut self) -> Result<(), CounterError> {
        self.group.reset().map_err(CounterError::Reset)
    }
}

impl std::fmt::Debug for PerfCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerfCounters")
            .field("events", &EVENT_NAMES)
            .finish()
    }
}
