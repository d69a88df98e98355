/*!
 * Process Module
 * Contract, registry, dependency resolution, and tick-scoped shared memory
 */

pub mod graph;
pub mod memory;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod types;

pub use graph::{DependencyGraph, Schedule};
pub use memory::{DependencyData, SharedApi, TickMemory};
pub use registry::{ProcessDescriptor, ProcessRegistry};
pub use resolver::RunningIndex;
pub use traits::{Process, RunResult, Typed, TypedProcess};
pub use types::{
    Identifier, ProcessError, ProcessFault, ProcessResult, ProcessSpecifier, DEFAULT_IDENTIFIER,
};
