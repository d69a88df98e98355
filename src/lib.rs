/*!
 * Colony Kernel Library
 *
 * In-tick process scheduling kernel for an autonomous agent running on a
 * stateless host: the whole process topology is rebuilt from the durable
 * store every cycle, scheduled in dependency order within a per-tick compute
 * budget, and written back at the tick boundary.
 */

pub mod console;
pub mod core;
pub mod persist;
pub mod process;
pub mod scheduler;

// Re-exports
pub use console::Console;
pub use core::{Cpu, CpuSnapshot, KernelError, KernelResult, Pid, Priority, Tick};
pub use persist::{DurableStore, MemoryStore, PersistError, RawRecord, StoreError};
pub use process::{
    DependencyData, Identifier, Process, ProcessError, ProcessFault, ProcessRegistry,
    ProcessSpecifier, SharedApi, TickMemory, Typed, TypedProcess,
};
pub use scheduler::budget::{BudgetConfig, CpuMeter, StaticMeter, WallClockMeter};
pub use scheduler::{ProcessManager, ProcessRecord, TickPhase, TickReport};
