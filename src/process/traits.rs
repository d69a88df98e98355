/*!
 * Process Contract
 *
 * Two layers, typed over erased:
 *
 * - `TypedProcess` is what a domain process implements. Its associated items
 *   pin the state shape, exposed-API shape, and dependency shape of one
 *   process kind at compile time.
 * - `Process` is the object-safe contract the scheduler drives. The `Typed`
 *   adapter erases a `TypedProcess` into a `Box<dyn Process>`; the kernel
 *   never inspects a process beyond this trait.
 */

use super::memory::{DependencyData, SharedApi};
use super::types::{Identifier, ProcessFault, ProcessResult, ProcessSpecifier};
use crate::core::limits::DEFAULT_PRIORITY;
use crate::core::types::{Pid, Priority};
use crate::persist::PersistError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Result of one `run` invocation: an API for dependents, or a contained fault
pub type RunResult = Result<Option<SharedApi>, ProcessFault>;

/// Object-safe process contract driven by the scheduler
///
/// The kernel calls these through the trait only; all cross-process
/// communication flows through the declared dependency/API channel.
pub trait Process: Send {
    /// Stable type tag, the `t` field of the persisted record
    fn kind(&self) -> &'static str;

    /// Instance identifier scoping this process among its kind
    fn identifier(&self) -> &Identifier;

    /// Declared dependency specifiers, in declaration order
    fn dependencies(&self) -> Vec<ProcessSpecifier>;

    /// Scheduling priority, consulted when the compute reserve is low
    fn priority(&self) -> Priority {
        DEFAULT_PRIORITY
    }

    /// Serialize this process's state for the durable store
    fn encode(&self) -> Result<Value, PersistError>;

    /// Extract the subset of this tick's shared memory this process needs
    ///
    /// `None` signals "not ready": a required dependency produced no data
    /// this tick, so the scheduler skips `run` without raising an error.
    /// The default policy requires every declared dependency; override to
    /// tolerate absent ones.
    fn dependent_data(&self, data: DependencyData) -> Option<DependencyData> {
        data.is_complete().then_some(data)
    }

    /// Execute one tick step
    fn run(&mut self, data: &DependencyData) -> RunResult;

    /// Optional operator-message capability
    fn receive_message(&mut self, message: &str) -> Option<String> {
        let _ = message;
        None
    }

    /// Human-readable one-liner for the operator console
    fn description(&self) -> String {
        format!("{}[{}]", self.kind(), self.identifier())
    }
}

/// Statically typed process definition
///
/// One implementation pins its identifier scoping, state shape, exposed-API
/// shape, and dependency shape all at once; `Typed` erases it for scheduling.
pub trait TypedProcess: Send + Sized + 'static {
    /// Stable type tag; must be unique within a registry
    const KIND: &'static str;

    /// Scheduling priority for every instance of this kind
    const PRIORITY: Priority = DEFAULT_PRIORITY;

    /// Persisted state payload
    type State: Serialize + DeserializeOwned;

    /// API object exposed to dependents each tick
    type Api: Send + Sync + 'static;

    /// Typed view of resolved dependency APIs passed to `run`
    type Deps;

    /// Construct a fresh instance at launch
    fn create(pid: Pid, identifier: &Identifier, args: &[String]) -> ProcessResult<Self>;

    /// Reconstruct an instance from persisted state at restore
    fn decode(pid: Pid, identifier: &Identifier, state: Self::State) -> Self;

    /// Serialize current state
    fn encode(&self) -> Self::State;

    /// Instance identifier (implementations keep it from create/decode)
    fn identifier(&self) -> &Identifier;

    /// Statically declared dependencies of an instance with this identifier
    fn dependencies(identifier: &Identifier) -> Vec<ProcessSpecifier>;

    /// Downcast the merged dependency view into this kind's typed shape
    ///
    /// `None` means "not ready this tick". The default implementations of
    /// kinds without dependencies simply return their unit shape.
    fn extract(&self, data: &DependencyData) -> Option<Self::Deps>;

    /// Execute one tick step with typed dependencies
    fn run(&mut self, deps: Self::Deps) -> Result<Option<Self::Api>, ProcessFault>;

    fn receive_message(&mut self, message: &str) -> Option<String> {
        let _ = message;
        None
    }

    fn description(&self) -> String {
        format!("{}[{}]", Self::KIND, self.identifier())
    }
}

/// Erasing adapter from `TypedProcess` to the scheduler contract
pub struct Typed<P: TypedProcess>(pub P);

impl<P: TypedProcess> Typed<P> {
    pub fn boxed(process: P) -> Box<dyn Process> {
        Box::new(Self(process))
    }
}

impl<P: TypedProcess> Process for Typed<P> {
    fn kind(&self) -> &'static str {
        P::KIND
    }

    fn identifier(&self) -> &Identifier {
        self.0.identifier()
    }

    fn dependencies(&self) -> Vec<ProcessSpecifier> {
        P::dependencies(self.0.identifier())
    }

    fn priority(&self) -> Priority {
        P::PRIORITY
    }

    fn encode(&self) -> Result<Value, PersistError> {
        Ok(serde_json::to_value(self.0.encode())?)
    }

    fn dependent_data(&self, data: DependencyData) -> Option<DependencyData> {
        // Readiness is the typed extraction succeeding, so a kind that
        // tolerates a missing dependency expresses that in `extract`.
        self.0.extract(&data).is_some().then_some(data)
    }

    fn run(&mut self, data: &DependencyData) -> RunResult {
        let deps = self
            .0
            .extract(data)
            .ok_or_else(|| ProcessFault::new("dependency data vanished between readiness and run"))?;
        let api = self.0.run(deps)?;
        Ok(api.map(|api| Arc::new(api) as SharedApi))
    }

    fn receive_message(&mut self, message: &str) -> Option<String> {
        self.0.receive_message(message)
    }

    fn description(&self) -> String {
        self.0.description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct CounterState {
        count: u32,
    }

    struct Counter {
        identifier: Identifier,
        count: u32,
    }

    impl TypedProcess for Counter {
        const KIND: &'static str = "counter";
        type State = CounterState;
        type Api = u32;
        type Deps = ();

        fn create(_pid: Pid, identifier: &Identifier, _args: &[String]) -> ProcessResult<Self> {
            Ok(Self {
                identifier: identifier.clone(),
                count: 0,
            })
        }

        fn decode(_pid: Pid, identifier: &Identifier, state: Self::State) -> Self {
            Self {
                identifier: identifier.clone(),
                count: state.count,
            }
        }

        fn encode(&self) -> Self::State {
            CounterState { count: self.count }
        }

        fn identifier(&self) -> &Identifier {
            &self.identifier
        }

        fn dependencies(_identifier: &Identifier) -> Vec<ProcessSpecifier> {
            Vec::new()
        }

        fn extract(&self, _data: &DependencyData) -> Option<Self::Deps> {
            Some(())
        }

        fn run(&mut self, _deps: Self::Deps) -> Result<Option<Self::Api>, ProcessFault> {
            self.count += 1;
            Ok(Some(self.count))
        }
    }

    #[test]
    fn test_erased_round_trip() {
        let mut process = Typed::boxed(
            Counter::create(1, &Identifier::Default, &[]).unwrap(),
        );
        assert_eq!(process.kind(), "counter");
        assert_eq!(process.description(), "counter[default]");

        let api = process.run(&DependencyData::new()).unwrap().unwrap();
        assert_eq!(*api.downcast::<u32>().unwrap(), 1);

        let state = process.encode().unwrap();
        assert_eq!(state["count"], 1);
    }

    struct Strict {
        identifier: Identifier,
    }

    impl Process for Strict {
        fn kind(&self) -> &'static str {
            "strict"
        }

        fn identifier(&self) -> &Identifier {
            &self.identifier
        }

        fn dependencies(&self) -> Vec<ProcessSpecifier> {
            vec![ProcessSpecifier::singleton("observer")]
        }

        fn encode(&self) -> Result<Value, PersistError> {
            Ok(Value::Null)
        }

        fn run(&mut self, _data: &DependencyData) -> RunResult {
            Ok(None)
        }
    }

    #[test]
    fn test_default_readiness_requires_all_dependencies() {
        let process = Strict {
            identifier: Identifier::Default,
        };

        let mut incomplete = DependencyData::new();
        incomplete.mark_missing(ProcessSpecifier::singleton("observer"));

        assert!(process.dependent_data(DependencyData::new()).is_some());
        assert!(process.dependent_data(incomplete).is_none());
    }
}
