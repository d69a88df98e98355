/*!
 * Core Types
 * Common types used across the kernel
 */

use serde::{Deserialize, Serialize};

/// Process ID type - allocated once at launch, never reused
pub type Pid = u32;

/// Tick counter type
pub type Tick = u64;

/// Priority level (0-7, higher is more important)
pub type Priority = u8;

/// CPU measured in host compute units (fractional)
pub type Cpu = f64;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;

/// Snapshot of the host compute budget at tick start
///
/// The host enforces a hard per-tick ceiling and banks unused compute into a
/// reserve ("bucket"). Both are inputs to the scheduler's shedding decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CpuSnapshot {
    pub limit: Cpu,
    pub bucket: Cpu,
}

impl CpuSnapshot {
    #[inline]
    #[must_use]
    pub const fn new(limit: Cpu, bucket: Cpu) -> Self {
        Self { limit, bucket }
    }
}

impl Default for CpuSnapshot {
    fn default() -> Self {
        Self {
            limit: crate::core::limits::DEFAULT_CPU_LIMIT,
            bucket: crate::core::limits::BUCKET_CAPACITY,
        }
    }
}
