/*!
 * Tick-Scoped Shared Memory
 * Arena of per-tick process APIs, rebuilt every cycle
 */

use super::types::ProcessSpecifier;
use crate::core::types::Pid;
use ahash::AHashMap;
use std::any::Any;
use std::sync::Arc;

/// Type-erased API a process exposed this tick
pub type SharedApi = Arc<dyn Any + Send + Sync>;

/// Tick-scoped map from PID to the API that process returned this tick
///
/// Created at tick start, populated append-only in schedule order, discarded
/// wholesale at tick end. Never persisted - stale APIs from a previous tick
/// must never be observable.
#[derive(Default)]
pub struct TickMemory {
    apis: AHashMap<Pid, SharedApi>,
}

impl TickMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the API a process returned this tick
    pub fn publish(&mut self, pid: Pid, api: SharedApi) {
        self.apis.insert(pid, api);
    }

    #[must_use]
    pub fn get(&self, pid: Pid) -> Option<&SharedApi> {
        self.apis.get(&pid)
    }

    #[must_use]
    pub fn contains(&self, pid: Pid) -> bool {
        self.apis.contains_key(&pid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.apis.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    /// Drop every API at tick end
    pub fn clear(&mut self) {
        self.apis.clear();
    }
}

/// Merged view of one process's resolved dependency APIs for this tick
///
/// Built by the scheduler before each `run` call: every declared specifier is
/// either present with the API its process returned this tick, or listed in
/// `missing`. The default readiness policy requires `missing` to be empty; a
/// process tolerating absent dependencies overrides `Process::dependent_data`.
#[derive(Default)]
pub struct DependencyData {
    apis: AHashMap<ProcessSpecifier, SharedApi>,
    missing: Vec<ProcessSpecifier>,
}

impl DependencyData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, specifier: ProcessSpecifier, api: SharedApi) {
        self.apis.insert(specifier, api);
    }

    pub fn mark_missing(&mut self, specifier: ProcessSpecifier) {
        self.missing.push(specifier);
    }

    /// Dependencies that did not produce data this tick
    #[must_use]
    pub fn missing(&self) -> &[ProcessSpecifier] {
        &self.missing
    }

    /// True when every declared dependency produced data this tick
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Typed access to one dependency's API
    #[must_use]
    pub fn api<T: Any + Send + Sync>(&self, specifier: &ProcessSpecifier) -> Option<Arc<T>> {
        self.apis
            .get(specifier)
            .and_then(|api| Arc::clone(api).downcast::<T>().ok())
    }

    /// Type-erased access, for processes that only probe presence
    #[must_use]
    pub fn raw(&self, specifier: &ProcessSpecifier) -> Option<&SharedApi> {
        self.apis.get(specifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnergyApi {
        available: u32,
    }

    #[test]
    fn test_publish_and_clear() {
        let mut memory = TickMemory::new();
        memory.publish(1, Arc::new(EnergyApi { available: 300 }));
        assert!(memory.contains(1));

        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_typed_downcast() {
        let spec = ProcessSpecifier::new("room_director", "W1N1");
        let mut data = DependencyData::new();
        data.insert(spec.clone(), Arc::new(EnergyApi { available: 550 }));

        let api = data.api::<EnergyApi>(&spec).unwrap();
        assert_eq!(api.available, 550);

        // Wrong type yields None, not a panic
        assert!(data.api::<String>(&spec).is_none());
    }

    #[test]
    fn test_missing_tracking() {
        let mut data = DependencyData::new();
        assert!(data.is_complete());

        data.mark_missing(ProcessSpecifier::singleton("observer"));
        assert!(!data.is_complete());
        assert_eq!(data.missing().len(), 1);
    }
}
