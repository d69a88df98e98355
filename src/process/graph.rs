/*!
 * Dependency Graph
 *
 * Per-tick graph over the running process set. The realized order must be
 * fully reconstructible from persisted data plus code - the host rebuilds
 * everything from scratch every tick - so ordering never leans on incidental
 * map iteration: ties break by ascending PID, always.
 */

use crate::core::types::Pid;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

/// Outcome of one topological pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Valid topological order: every dependency precedes its dependents
    pub order: Vec<Pid>,
    /// Processes stuck behind a dependency cycle this tick, ascending PID.
    /// Includes the cycle members and anything scheduled strictly after them;
    /// none of these run this tick, all are retried next tick.
    pub stuck: Vec<Pid>,
}

impl Schedule {
    /// True when a cycle prevented part of the graph from being ordered
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        !self.stuck.is_empty()
    }
}

/// Dependency graph keyed by stable PIDs
#[derive(Debug, Default)]
pub struct DependencyGraph {
    dependents: BTreeMap<Pid, Vec<Pid>>,
    indegree: BTreeMap<Pid, usize>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, pid: Pid) {
        self.dependents.entry(pid).or_default();
        self.indegree.entry(pid).or_insert(0);
    }

    /// Record that `dependent` requires `dependency` to run first.
    /// Both endpoints must already be nodes; edges to absent processes are a
    /// run-time readiness concern, not a graph concern.
    pub fn add_edge(&mut self, dependency: Pid, dependent: Pid) {
        debug_assert!(self.indegree.contains_key(&dependency));
        debug_assert!(self.indegree.contains_key(&dependent));
        self.dependents
            .entry(dependency)
            .or_default()
            .push(dependent);
        *self.indegree.entry(dependent).or_insert(0) += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indegree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indegree.is_empty()
    }

    /// Kahn's algorithm with an ascending-PID ready heap
    #[must_use]
    pub fn schedule(&self) -> Schedule {
        let mut indegree = self.indegree.clone();
        let mut ready: BinaryHeap<Reverse<Pid>> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(pid, _)| Reverse(*pid))
            .collect();

        let mut order = Vec::with_capacity(indegree.len());
        while let Some(Reverse(pid)) = ready.pop() {
            order.push(pid);
            if let Some(dependents) = self.dependents.get(&pid) {
                for &dependent in dependents {
                    let degree = indegree
                        .get_mut(&dependent)
                        .filter(|degree| **degree > 0);
                    if let Some(degree) = degree {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.push(Reverse(dependent));
                        }
                    }
                }
            }
        }

        // Anything still holding indegree is behind a cycle; BTreeMap
        // iteration keeps the stuck set ascending
        let stuck: Vec<Pid> = indegree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(pid, _)| *pid)
            .collect();

        Schedule { order, stuck }
    }
}
