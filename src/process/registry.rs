/*!
 * Process Registry
 *
 * Append-only kind -> descriptor table used to construct processes at launch
 * and reconstruct them from persisted records at restore. Populated once, at
 * process-set composition time, before the scheduler starts; each kind brings
 * its own create/decode shims so no central switch statement grows with the
 * process set.
 */

use super::traits::{Process, Typed, TypedProcess};
use super::types::{Identifier, ProcessError, ProcessResult, ProcessSpecifier};
use crate::core::types::{Pid, Priority};
use crate::persist::PersistError;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

type CreateFn = fn(Pid, &Identifier, &[String]) -> ProcessResult<Box<dyn Process>>;
type DecodeFn = fn(Pid, &Identifier, &Value) -> Result<Box<dyn Process>, PersistError>;
type DependenciesFn = fn(&Identifier) -> Vec<ProcessSpecifier>;

/// Constructors and static metadata for one registered process kind
#[derive(Clone)]
pub struct ProcessDescriptor {
    kind: &'static str,
    priority: Priority,
    create: CreateFn,
    decode: DecodeFn,
    dependencies: DependenciesFn,
}

impl ProcessDescriptor {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn create(
        &self,
        pid: Pid,
        identifier: &Identifier,
        args: &[String],
    ) -> ProcessResult<Box<dyn Process>> {
        (self.create)(pid, identifier, args)
    }

    pub fn decode(
        &self,
        pid: Pid,
        identifier: &Identifier,
        state: &Value,
    ) -> Result<Box<dyn Process>, PersistError> {
        (self.decode)(pid, identifier, state)
    }

    /// Dependencies an instance with this identifier would declare
    #[must_use]
    pub fn dependencies(&self, identifier: &Identifier) -> Vec<ProcessSpecifier> {
        (self.dependencies)(identifier)
    }
}

fn create_shim<P: TypedProcess>(
    pid: Pid,
    identifier: &Identifier,
    args: &[String],
) -> ProcessResult<Box<dyn Process>> {
    P::create(pid, identifier, args).map(Typed::boxed)
}

fn decode_shim<P: TypedProcess>(
    pid: Pid,
    identifier: &Identifier,
    state: &Value,
) -> Result<Box<dyn Process>, PersistError> {
    // Records written before a kind gained state carry no payload at all
    let state: P::State = if state.is_null() {
        serde_json::from_value(Value::Object(Default::default()))?
    } else {
        serde_json::from_value(state.clone())?
    };
    Ok(Typed::boxed(P::decode(pid, identifier, state)))
}

/// Registry of every process kind known to this deployment
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    kinds: BTreeMap<&'static str, ProcessDescriptor>,
}

impl ProcessRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process kind. Duplicate kinds are a composition-time
    /// mistake, asserted here rather than surfaced at restore.
    #[must_use]
    pub fn register<P: TypedProcess>(mut self) -> Self {
        let descriptor = ProcessDescriptor {
            kind: P::KIND,
            priority: P::PRIORITY,
            create: create_shim::<P>,
            decode: decode_shim::<P>,
            dependencies: P::dependencies,
        };
        let replaced = self.kinds.insert(P::KIND, descriptor);
        assert!(
            replaced.is_none(),
            "process kind {:?} registered twice",
            P::KIND
        );
        debug!("Registered process kind: {}", P::KIND);
        self
    }

    #[must_use]
    pub fn descriptor(&self, kind: &str) -> Option<&ProcessDescriptor> {
        self.kinds.get(kind)
    }

    /// Descriptor lookup that surfaces the unknown-kind error
    pub fn require(&self, kind: &str) -> ProcessResult<&ProcessDescriptor> {
        self.descriptor(kind)
            .ok_or_else(|| ProcessError::UnknownKind(kind.to_string()))
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Registered kinds in stable order
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
