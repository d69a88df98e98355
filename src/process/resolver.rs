/*!
 * Dependency Resolver
 *
 * Maps declared dependency specifiers to concrete running processes. Exact
 * (kind, identifier) match only - a missing identifier never falls back to
 * the default instance.
 *
 * The same index serves two rules with different severities:
 * - launch time: any unresolved specifier is a hard rejection
 * - run time: an unresolved or silent specifier is a soft "not ready"
 */

use super::memory::{DependencyData, TickMemory};
use super::types::{ProcessError, ProcessResult, ProcessSpecifier};
use crate::core::types::Pid;
use ahash::AHashMap;
use std::sync::Arc;

/// Index of currently running processes by (kind, identifier)
#[derive(Default)]
pub struct RunningIndex {
    by_specifier: AHashMap<ProcessSpecifier, Pid>,
}

impl RunningIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, specifier: ProcessSpecifier, pid: Pid) {
        self.by_specifier.insert(specifier, pid);
    }

    /// Resolve one specifier to the PID of the running process it addresses
    #[must_use]
    pub fn resolve(&self, specifier: &ProcessSpecifier) -> Option<Pid> {
        self.by_specifier.get(specifier).copied()
    }

    #[must_use]
    pub fn contains(&self, specifier: &ProcessSpecifier) -> bool {
        self.by_specifier.contains_key(specifier)
    }

    /// Launch-time validation: every declared specifier must resolve, and the
    /// rejection names every missing one, not just the first.
    pub fn require_all(&self, specifiers: &[ProcessSpecifier]) -> ProcessResult<()> {
        let missing: Vec<ProcessSpecifier> = specifiers
            .iter()
            .filter(|specifier| !self.contains(specifier))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProcessError::LackOfDependencies { missing })
        }
    }

    /// PIDs the specifiers resolve to right now, for dependency-graph edges
    #[must_use]
    pub fn resolve_edges(&self, specifiers: &[ProcessSpecifier]) -> Vec<Pid> {
        specifiers
            .iter()
            .filter_map(|specifier| self.resolve(specifier))
            .collect()
    }

    /// Build the merged dependency view for one process this tick
    ///
    /// A specifier counts as missing when it no longer resolves (killed or
    /// suspended since launch) or when its process produced no API this tick
    /// (skipped, faulted, or ran without exposing one). Both collapse into
    /// the same soft readiness signal.
    #[must_use]
    pub fn dependency_data(
        &self,
        specifiers: &[ProcessSpecifier],
        memory: &TickMemory,
    ) -> DependencyData {
        let mut data = DependencyData::new();
        for specifier in specifiers {
            match self.resolve(specifier).and_then(|pid| memory.get(pid)) {
                Some(api) => data.insert(specifier.clone(), Arc::clone(api)),
                None => data.mark_missing(specifier.clone()),
            }
        }
        data
    }
}
