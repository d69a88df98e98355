/*!
 * Compute Budget Tracking
 *
 * The host enforces a hard per-tick CPU ceiling; exceeding it aborts the
 * whole tick and loses strictly more work than skipping one process. The
 * scheduler therefore sheds work in two situations: the banked reserve is
 * low (lower-priority processes sit the tick out) or the tick itself is
 * close to the ceiling (nothing further starts).
 */

use crate::core::limits::{BUCKET_FLOOR, CPU_SOFT_CEILING_RATIO, PRIORITY_FLOOR};
use crate::core::types::{Cpu, CpuSnapshot, Priority};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Source of "CPU consumed so far this tick"
///
/// Injectable so tests can script consumption; hosts that meter compute
/// themselves adapt their counter behind this trait.
pub trait CpuMeter {
    fn used(&self) -> Cpu;
}

/// Wall-clock meter: one compute unit per millisecond since tick start
#[derive(Debug)]
pub struct WallClockMeter {
    start: Instant,
}

impl WallClockMeter {
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl CpuMeter for WallClockMeter {
    fn used(&self) -> Cpu {
        self.start.elapsed().as_secs_f64() * 1_000.0
    }
}

/// Meter reporting a fixed consumption, for tests and unmetered hosts
#[derive(Debug, Clone, Copy)]
pub struct StaticMeter(pub Cpu);

impl CpuMeter for StaticMeter {
    fn used(&self) -> Cpu {
        self.0
    }
}

/// Budget thresholds, with defaults from `core::limits`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BudgetConfig {
    /// Reserve level below which low-priority shedding kicks in
    pub bucket_floor: Cpu,
    /// Priorities strictly below this are shed when the reserve is low
    pub priority_floor: Priority,
    /// Fraction of the ceiling spent before no further process starts
    pub soft_ceiling_ratio: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            bucket_floor: BUCKET_FLOOR,
            priority_floor: PRIORITY_FLOOR,
            soft_ceiling_ratio: CPU_SOFT_CEILING_RATIO,
        }
    }
}

impl BudgetConfig {
    #[inline]
    #[must_use]
    pub fn with_bucket_floor(mut self, bucket_floor: Cpu) -> Self {
        self.bucket_floor = bucket_floor;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_priority_floor(mut self, priority_floor: Priority) -> Self {
        self.priority_floor = priority_floor;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_soft_ceiling_ratio(mut self, ratio: f64) -> Self {
        self.soft_ceiling_ratio = ratio;
        self
    }
}

/// Admission decision for one process at its turn in the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Run,
    /// Reserve is low and this process's priority is below the floor
    ShedLowPriority,
    /// Cumulative consumption is too close to the hard ceiling
    CeilingReached,
}

/// Per-tick budget state
#[derive(Debug, Clone, Copy)]
pub struct TickBudget {
    config: BudgetConfig,
    snapshot: CpuSnapshot,
}

impl TickBudget {
    #[must_use]
    pub fn new(config: BudgetConfig, snapshot: CpuSnapshot) -> Self {
        Self { config, snapshot }
    }

    /// True when the banked reserve is low enough to shed work
    #[must_use]
    pub fn reserve_is_low(&self) -> bool {
        self.snapshot.bucket < self.config.bucket_floor
    }

    /// Decide whether the next process may start
    #[must_use]
    pub fn admit(&self, used: Cpu, priority: Priority) -> Admission {
        if used >= self.snapshot.limit * self.config.soft_ceiling_ratio {
            return Admission::CeilingReached;
        }
        if self.reserve_is_low() && priority < self.config.priority_floor {
            return Admission::ShedLowPriority;
        }
        Admission::Run
    }
}
