/*!
 * Kernel Limits
 * Centralized constants for budget and scheduling defaults
 */

use super::types::{Cpu, Priority};

/// Default hard per-tick CPU ceiling granted by the host
pub const DEFAULT_CPU_LIMIT: Cpu = 20.0;

/// Capacity of the host's banked compute reserve
pub const BUCKET_CAPACITY: Cpu = 10_000.0;

/// Reserve level below which low-priority processes are shed
pub const BUCKET_FLOOR: Cpu = 1_000.0;

/// Processes below this priority are shed when the reserve is low
pub const PRIORITY_FLOOR: Priority = 4;

/// Fraction of the per-tick ceiling the scheduler will spend before it stops
/// starting new processes; exceeding the ceiling aborts the whole tick, which
/// loses strictly more work than skipping the tail of the schedule.
pub const CPU_SOFT_CEILING_RATIO: f64 = 0.9;

/// Default priority assigned to processes that do not declare one
pub const DEFAULT_PRIORITY: Priority = 4;

/// Highest priority
pub const MAX_PRIORITY: Priority = 7;
