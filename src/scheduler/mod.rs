/*!
 * Process Scheduler
 *
 * `ProcessManager` owns the process table and drives the per-tick state
 * machine: idle -> restore table -> run eligible processes -> persist -> idle.
 * The host is stateless between ticks, so everything here is rebuilt from the
 * durable store plus the registry every cycle.
 */

pub mod budget;

use crate::core::types::{CpuSnapshot, KernelResult, Pid, Tick};
use crate::persist::{
    decode_table, encode_table, DurableStore, PersistError, RawRecord, NEXT_PID_KEY,
    PROCESS_TABLE_KEY,
};
use crate::process::{
    DependencyGraph, Identifier, Process, ProcessError, ProcessRegistry, ProcessResult,
    ProcessSpecifier, RunningIndex, TickMemory,
};
use budget::{Admission, BudgetConfig, CpuMeter, TickBudget};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// One entry in the process table
///
/// The kernel owns identity and the running flag; everything else lives
/// behind the process contract.
pub struct ProcessRecord {
    pid: Pid,
    running: bool,
    /// Last state payload that encoded cleanly, written instead of the live
    /// state when `encode` fails at persist
    last_state: Value,
    process: Box<dyn Process>,
}

impl ProcessRecord {
    #[inline]
    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.process.kind()
    }

    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        self.process.identifier()
    }

    #[must_use]
    pub fn specifier(&self) -> ProcessSpecifier {
        ProcessSpecifier::new(self.kind(), self.identifier().clone())
    }

    #[must_use]
    pub fn dependencies(&self) -> Vec<ProcessSpecifier> {
        self.process.dependencies()
    }

    #[must_use]
    pub fn description(&self) -> String {
        self.process.description()
    }
}

/// Phase of the per-tick state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Restoring,
    Running,
    Persisting,
}

/// What the scheduler did in one tick, in realized order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TickReport {
    pub tick: Tick,
    /// Processes whose `run` was invoked, in schedule order
    pub ran: Vec<Pid>,
    /// Skipped because a dependency produced no data this tick
    pub skipped_not_ready: Vec<Pid>,
    /// Skipped by the compute-budget policy
    pub skipped_budget: Vec<Pid>,
    /// Faulted inside `run`; state rolled back, retried next tick
    pub faulted: Vec<Pid>,
    /// Stuck behind a dependency cycle this tick
    pub stuck_in_cycle: Vec<Pid>,
    /// Records preserved-but-skipped at restore (unknown kind or bad state)
    pub quarantined: usize,
}

/// Scheduler and process-table owner
pub struct ProcessManager {
    registry: ProcessRegistry,
    records: BTreeMap<Pid, ProcessRecord>,
    quarantine: Vec<RawRecord>,
    next_pid: Pid,
    tick: Tick,
    phase: TickPhase,
    budget_config: BudgetConfig,
}

impl ProcessManager {
    #[must_use]
    pub fn new(registry: ProcessRegistry) -> Self {
        info!(
            "Process manager initialized with {} registered kinds",
            registry.len()
        );
        Self {
            registry,
            records: BTreeMap::new(),
            quarantine: Vec::new(),
            next_pid: 1,
            tick: 0,
            phase: TickPhase::Idle,
            budget_config: BudgetConfig::default(),
        }
    }

    #[must_use]
    pub fn with_budget_config(mut self, config: BudgetConfig) -> Self {
        self.budget_config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    #[inline]
    #[must_use]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn record(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.records.get(&pid)
    }

    /// Records in ascending PID order
    pub fn records(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn quarantined(&self) -> &[RawRecord] {
        &self.quarantine
    }

    // ---- restore / persist -------------------------------------------------

    /// Rebuild the process table from the durable store
    ///
    /// Records with an unknown kind, and records whose state no longer
    /// decodes, are quarantined: excluded from scheduling but written back
    /// verbatim at persist, so a different deployment can still read them.
    pub fn restore(&mut self, store: &dyn DurableStore) -> Result<(), PersistError> {
        debug_assert_eq!(self.phase, TickPhase::Idle);
        self.phase = TickPhase::Restoring;
        let result = self.restore_table(store);
        self.phase = TickPhase::Idle;
        result
    }

    fn restore_table(&mut self, store: &dyn DurableStore) -> Result<(), PersistError> {
        self.records.clear();
        self.quarantine.clear();

        let raws = match store.load(PROCESS_TABLE_KEY)? {
            Some(document) => decode_table(&document)?,
            None => Vec::new(),
        };

        let mut highest_pid = 0;
        for raw in raws {
            highest_pid = highest_pid.max(raw.pid);
            match self.registry.descriptor(&raw.kind) {
                Some(descriptor) => {
                    match descriptor.decode(raw.pid, &raw.identifier, &raw.state) {
                        Ok(process) => {
                            self.records.insert(
                                raw.pid,
                                ProcessRecord {
                                    pid: raw.pid,
                                    running: raw.running,
                                    last_state: raw.state,
                                    process,
                                },
                            );
                        }
                        Err(err) => {
                            warn!(
                                "Quarantined PID {} ({}): state failed to decode: {}",
                                raw.pid, raw.kind, err
                            );
                            self.quarantine.push(raw);
                        }
                    }
                }
                None => {
                    warn!(
                        "Quarantined PID {}: unknown process kind {:?}",
                        raw.pid, raw.kind
                    );
                    self.quarantine.push(raw);
                }
            }
        }

        let stored_next = match store.load(NEXT_PID_KEY)? {
            Some(document) => document
                .trim()
                .parse::<Pid>()
                .map_err(|err| PersistError::MalformedTable(format!("next pid: {err}")))?,
            None => 1,
        };
        self.next_pid = stored_next.max(highest_pid + 1);

        debug!(
            "Restored {} processes ({} quarantined), next PID {}",
            self.records.len(),
            self.quarantine.len(),
            self.next_pid
        );
        Ok(())
    }

    /// Write the process table back to the durable store
    pub fn persist(&mut self, store: &mut dyn DurableStore) -> Result<(), PersistError> {
        debug_assert_eq!(self.phase, TickPhase::Idle);
        self.phase = TickPhase::Persisting;
        let result = self.persist_table(store);
        self.phase = TickPhase::Idle;
        result
    }

    fn persist_table(&mut self, store: &mut dyn DurableStore) -> Result<(), PersistError> {
        let mut raws = Vec::with_capacity(self.records.len() + self.quarantine.len());
        for record in self.records.values_mut() {
            let state = match record.process.encode() {
                Ok(state) => {
                    record.last_state = state.clone();
                    state
                }
                Err(err) => {
                    // Contained like a run fault: the record survives with
                    // the last state that encoded cleanly, so a wedged
                    // encoder cannot erase what an earlier tick persisted.
                    error!(
                        "PID {} ({}) failed to encode state, persisting last good snapshot: {}",
                        record.pid,
                        record.kind(),
                        err
                    );
                    record.last_state.clone()
                }
            };
            let mut raw = RawRecord::new(record.kind(), record.pid, record.identifier().clone());
            raw.running = record.running;
            raw.state = state;
            raws.push(raw);
        }
        raws.extend(self.quarantine.iter().cloned());

        let document = encode_table(&raws)?;
        store.save(PROCESS_TABLE_KEY, &document)?;
        store.save(NEXT_PID_KEY, &self.next_pid.to_string())?;
        Ok(())
    }

    // ---- lifecycle operations ----------------------------------------------

    /// Register and validate a new process
    ///
    /// Rejected before any mutation: a running occupant of the same
    /// (kind, identifier), or any statically declared dependency that does
    /// not currently resolve.
    pub fn launch(
        &mut self,
        kind: &str,
        identifier: Identifier,
        args: &[String],
    ) -> ProcessResult<Pid> {
        if matches!(&identifier, Identifier::Named(name) if name == crate::process::DEFAULT_IDENTIFIER)
        {
            return Err(ProcessError::ReservedIdentifier);
        }

        let descriptor = self.registry.require(kind)?;

        let specifier = ProcessSpecifier::new(kind, identifier.clone());
        if let Some(existing) = self
            .records
            .values()
            .find(|record| record.running && record.specifier() == specifier)
        {
            return Err(ProcessError::AlreadyLaunched {
                kind: kind.to_string(),
                identifier,
                existing: existing.pid,
            });
        }

        let declared = descriptor.dependencies(&identifier);
        self.running_index().require_all(&declared)?;

        let pid = self.next_pid;
        let process = descriptor.create(pid, &identifier, args)?;
        self.next_pid += 1;
        let last_state = process.encode().unwrap_or(Value::Null);
        self.records.insert(
            pid,
            ProcessRecord {
                pid,
                running: true,
                last_state,
                process,
            },
        );

        info!("Launched {} as PID {}", specifier, pid);
        Ok(pid)
    }

    /// Stop scheduling a process without discarding its state
    ///
    /// Dependents are not touched: they observe "not ready" at their next
    /// resolution, which cascades suspension transitively as an emergent
    /// property of readiness, not an explicit teardown.
    pub fn suspend(&mut self, pid: Pid) -> ProcessResult<()> {
        let record = self
            .records
            .get_mut(&pid)
            .ok_or(ProcessError::NotFound(pid))?;
        record.running = false;
        info!("Suspended PID {} ({})", pid, record.process.description());
        Ok(())
    }

    /// Resume a suspended process
    ///
    /// Re-validated like a launch: if a relaunch took this record's
    /// (kind, identifier) while it was suspended, resuming would put two
    /// running processes on one specifier, so it is rejected instead.
    pub fn resume(&mut self, pid: Pid) -> ProcessResult<()> {
        let record = self.records.get(&pid).ok_or(ProcessError::NotFound(pid))?;
        let specifier = record.specifier();
        if let Some(occupant) = self
            .records
            .values()
            .find(|other| other.pid != pid && other.running && other.specifier() == specifier)
        {
            return Err(ProcessError::AlreadyLaunched {
                kind: specifier.kind,
                identifier: specifier.identifier,
                existing: occupant.pid,
            });
        }

        let record = self
            .records
            .get_mut(&pid)
            .ok_or(ProcessError::NotFound(pid))?;
        record.running = true;
        info!("Resumed PID {} ({})", pid, record.process.description());
        Ok(())
    }

    /// Remove a process permanently
    ///
    /// No cascade: each dependent discovers the gap at its next resolution
    /// and applies its own degraded-behavior policy.
    pub fn kill(&mut self, pid: Pid) -> ProcessResult<()> {
        let record = self.records.remove(&pid).ok_or(ProcessError::NotFound(pid))?;
        info!("Killed PID {} ({})", pid, record.process.description());
        Ok(())
    }

    /// Route an operator message to a process's optional handler
    pub fn deliver_message(&mut self, pid: Pid, message: &str) -> ProcessResult<Option<String>> {
        let record = self
            .records
            .get_mut(&pid)
            .ok_or(ProcessError::NotFound(pid))?;
        Ok(record.process.receive_message(message))
    }

    // ---- scheduling --------------------------------------------------------

    fn running_index(&self) -> RunningIndex {
        let mut index = RunningIndex::new();
        for record in self.records.values().filter(|record| record.running) {
            index.insert(record.specifier(), record.pid);
        }
        index
    }

    /// Execute one tick over the eligible process set
    pub fn run_tick(&mut self, snapshot: CpuSnapshot, meter: &dyn CpuMeter) -> TickReport {
        debug_assert_eq!(self.phase, TickPhase::Idle);
        self.phase = TickPhase::Running;
        self.tick += 1;

        let index = self.running_index();

        let mut graph = DependencyGraph::new();
        for record in self.records.values().filter(|record| record.running) {
            graph.add_node(record.pid);
        }
        for record in self.records.values().filter(|record| record.running) {
            for dependency in index.resolve_edges(&record.process.dependencies()) {
                graph.add_edge(dependency, record.pid);
            }
        }

        let schedule = graph.schedule();
        if schedule.has_cycle() {
            // One diagnostic for the whole cyclic subgraph, retried next tick
            warn!(
                "Dependency cycle on tick {}: PIDs {:?} skipped",
                self.tick, schedule.stuck
            );
        }

        let budget = TickBudget::new(self.budget_config, snapshot);
        let mut memory = TickMemory::new();
        let mut report = TickReport {
            tick: self.tick,
            stuck_in_cycle: schedule.stuck,
            quarantined: self.quarantine.len(),
            ..TickReport::default()
        };

        let registry = &self.registry;
        for pid in schedule.order {
            let record = match self.records.get_mut(&pid) {
                Some(record) => record,
                None => continue,
            };

            match budget.admit(meter.used(), record.process.priority()) {
                Admission::Run => {}
                Admission::ShedLowPriority => {
                    debug!("PID {} shed: reserve low", pid);
                    report.skipped_budget.push(pid);
                    continue;
                }
                Admission::CeilingReached => {
                    debug!("PID {} shed: tick ceiling reached", pid);
                    report.skipped_budget.push(pid);
                    continue;
                }
            }

            let data = index.dependency_data(&record.process.dependencies(), &memory);
            let data = match record.process.dependent_data(data) {
                Some(data) => data,
                None => {
                    debug!("PID {} not ready: dependency produced no data", pid);
                    report.skipped_not_ready.push(pid);
                    continue;
                }
            };

            // Snapshot before running so a fault can neither corrupt nor
            // silently advance this process's persisted state.
            let before = match record.process.encode() {
                Ok(state) => state,
                Err(err) => {
                    error!("PID {} state snapshot failed, skipping run: {}", pid, err);
                    report.faulted.push(pid);
                    continue;
                }
            };
            record.last_state = before.clone();

            match catch_unwind(AssertUnwindSafe(|| record.process.run(&data))) {
                Ok(Ok(api)) => {
                    if let Some(api) = api {
                        memory.publish(pid, api);
                    }
                    report.ran.push(pid);
                }
                Ok(Err(fault)) => {
                    error!("PID {} ({}) faulted: {}", pid, record.kind(), fault);
                    rollback(registry, record, &before);
                    report.faulted.push(pid);
                }
                Err(panic) => {
                    error!(
                        "PID {} ({}) panicked: {}",
                        pid,
                        record.kind(),
                        panic_message(&panic)
                    );
                    rollback(registry, record, &before);
                    report.faulted.push(pid);
                }
            }
        }

        // Tick-scoped by construction; dropped here, never persisted
        memory.clear();

        self.phase = TickPhase::Idle;
        report
    }

    /// Convenience wrapper for hosts that drive whole cycles:
    /// restore -> run -> persist.
    pub fn tick_cycle(
        &mut self,
        store: &mut dyn DurableStore,
        snapshot: CpuSnapshot,
        meter: &dyn CpuMeter,
    ) -> KernelResult<TickReport> {
        self.restore(store)?;
        let report = self.run_tick(snapshot, meter);
        self.persist(store)?;
        Ok(report)
    }
}

/// Re-decode a faulting process from its pre-run snapshot
fn rollback(registry: &ProcessRegistry, record: &mut ProcessRecord, before: &Value) {
    let Some(descriptor) = registry.descriptor(record.kind()) else {
        return;
    };
    let identifier = record.identifier().clone();
    match descriptor.decode(record.pid, &identifier, before) {
        Ok(process) => record.process = process,
        Err(err) => {
            warn!(
                "PID {} rollback failed, keeping in-memory state: {}",
                record.pid, err
            );
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
