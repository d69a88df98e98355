/*!
 * Core Module
 * Shared types, errors, and limits
 */

pub mod errors;
pub mod limits;
pub mod types;

pub use errors::KernelError;
pub use types::{Cpu, CpuSnapshot, KernelResult, Pid, Priority, Tick};
