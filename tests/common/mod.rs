/*!
 * Shared fixtures: a small colony of process kinds exercising the kernel
 */

// Not every test binary uses every fixture
#![allow(dead_code)]

use colony_kernel::{
    DependencyData, Identifier, Pid, ProcessFault, ProcessRegistry, ProcessSpecifier,
    TypedProcess,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn registry() -> ProcessRegistry {
    ProcessRegistry::new()
        .register::<RoomDirector>()
        .register::<WorkerPool>()
        .register::<Scout>()
        .register::<Flaky>()
        .register::<CycleA>()
        .register::<CycleB>()
}

// ---- room_director ---------------------------------------------------------

pub struct RoomDirectorApi {
    pub energy: u32,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoomDirectorState {
    pub energy: u32,
}

/// Per-room coordinator: no dependencies, exposes the room's energy ledger
pub struct RoomDirector {
    identifier: Identifier,
    energy: u32,
}

impl TypedProcess for RoomDirector {
    const KIND: &'static str = "room_director";
    const PRIORITY: u8 = 6;
    type State = RoomDirectorState;
    type Api = RoomDirectorApi;
    type Deps = ();

    fn create(_pid: Pid, identifier: &Identifier, _args: &[String]) -> Result<Self, colony_kernel::ProcessError> {
        Ok(Self {
            identifier: identifier.clone(),
            energy: 0,
        })
    }

    fn decode(_pid: Pid, identifier: &Identifier, state: Self::State) -> Self {
        Self {
            identifier: identifier.clone(),
            energy: state.energy,
        }
    }

    fn encode(&self) -> Self::State {
        RoomDirectorState {
            energy: self.energy,
        }
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
        self.energy += 50;
        Ok(Some(RoomDirectorApi {
            energy: self.energy,
        }))
    }
}

// ---- worker_pool -----------------------------------------------------------

pub struct WorkerPoolApi {
    pub workers: u32,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkerPoolState {
    pub observed: Vec<u32>,
}

/// Depends on its room's director and records the energy it observed
pub struct WorkerPool {
    identifier: Identifier,
    observed: Vec<u32>,
}

impl WorkerPool {
    fn director(identifier: &Identifier) -> ProcessSpecifier {
        ProcessSpecifier::new(RoomDirector::KIND, identifier.clone())
    }
}

impl TypedProcess for WorkerPool {
    const KIND: &'static str = "worker_pool";
    const PRIORITY: u8 = 3;
    type State = WorkerPoolState;
    type Api = WorkerPoolApi;
    type Deps = Arc<RoomDirectorApi>;

    fn create(_pid: Pid, identifier: &Identifier, _args: &[String]) -> Result<Self, colony_kernel::ProcessError> {
        Ok(Self {
            identifier: identifier.clone(),
            observed: Vec::new(),
        })
    }

    fn decode(_pid: Pid, identifier: &Identifier, state: Self::State) -> Self {
        Self {
            identifier: identifier.clone(),
            observed: state.observed,
        }
    }

    fn encode(&self) -> Self::State {
        WorkerPoolState {
            observed: self.observed.clone(),
        }
    }

    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    fn dependencies(identifier: &Identifier) -> Vec<ProcessSpecifier> {
        vec![Self::director(identifier)]
    }

    fn extract(&self, data: &DependencyData) -> Option<Self::Deps> {
        data.api::<RoomDirectorApi>(&Self::director(&self.identifier))
    }

    fn run(&mut self, director: Self::Deps) -> Result<Option<Self::Api>, ProcessFault> {
        self.observed.push(director.energy);
        Ok(Some(WorkerPoolApi {
            workers: self.observed.len() as u32,
        }))
    }
}

// ---- scout -----------------------------------------------------------------

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoutState {
    pub trips: u32,
}

/// Declares a director dependency but tolerates its absence
pub struct Scout {
    identifier: Identifier,
    trips: u32,
    saw_director: bool,
}

impl Scout {
    fn director(identifier: &Identifier) -> ProcessSpecifier {
        ProcessSpecifier::new(RoomDirector::KIND, identifier.clone())
    }
}

impl TypedProcess for Scout {
    const KIND: &'static str = "scout";
    const PRIORITY: u8 = 2;
    type State = ScoutState;
    type Api = u32;
    type Deps = Option<Arc<RoomDirectorApi>>;

    fn create(_pid: Pid, identifier: &Identifier, _args: &[String]) -> Result<Self, colony_kernel::ProcessError> {
        Ok(Self {
            identifier: identifier.clone(),
            trips: 0,
            saw_director: false,
        })
    }

    fn decode(_pid: Pid, identifier: &Identifier, state: Self::State) -> Self {
        Self {
            identifier: identifier.clone(),
            trips: state.trips,
            saw_director: false,
        }
    }

    fn encode(&self) -> Self::State {
        ScoutState { trips: self.trips }
    }

    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    fn dependencies(identifier: &Identifier) -> Vec<ProcessSpecifier> {
        vec![Self::director(identifier)]
    }

    fn extract(&self, data: &DependencyData) -> Option<Self::Deps> {
        // Tolerant: a missing director degrades the trip, never skips it
        Some(data.api::<RoomDirectorApi>(&Self::director(&self.identifier)))
    }

    fn run(&mut self, director: Self::Deps) -> Result<Option<Self::Api>, ProcessFault> {
        self.trips += 1;
        self.saw_director = director.is_some();
        Ok(Some(self.trips))
    }

    fn receive_message(&mut self, message: &str) -> Option<String> {
        match message {
            "report" => Some(format!(
                "scout[{}]: {} trips, director {}",
                self.identifier,
                self.trips,
                if self.saw_director { "seen" } else { "unseen" }
            )),
            _ => None,
        }
    }
}

// ---- flaky -----------------------------------------------------------------

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FlakyState {
    pub runs: u32,
    pub fail_at: Option<u32>,
    #[serde(default)]
    pub panics: bool,
}

/// Faults on its N-th invocation, by error or by panic
pub struct Flaky {
    identifier: Identifier,
    state: FlakyState,
}

impl TypedProcess for Flaky {
    const KIND: &'static str = "flaky";
    const PRIORITY: u8 = 2;
    type State = FlakyState;
    type Api = u32;
    type Deps = ();

    fn create(_pid: Pid, identifier: &Identifier, args: &[String]) -> Result<Self, colony_kernel::ProcessError> {
        let fail_at = args.first().and_then(|raw| raw.parse().ok());
        let panics = args.get(1).map(|mode| mode.as_str() == "panic").unwrap_or(false);
        Ok(Self {
            identifier: identifier.clone(),
            state: FlakyState {
                runs: 0,
                fail_at,
                panics,
            },
        })
    }

    fn decode(_pid: Pid, identifier: &Identifier, state: Self::State) -> Self {
        Self {
            identifier: identifier.clone(),
            state,
        }
    }

    fn encode(&self) -> Self::State {
        FlakyState {
            runs: self.state.runs,
            fail_at: self.state.fail_at,
            panics: self.state.panics,
        }
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
        // Mutate first so a fault exercises the scheduler's rollback
        self.state.runs += 1;
        if self.state.fail_at == Some(self.state.runs) {
            if self.state.panics {
                panic!("flaky process blew up on run {}", self.state.runs);
            }
            return Err(ProcessFault::new(format!(
                "flaky process failed on run {}",
                self.state.runs
            )));
        }
        Ok(Some(self.state.runs))
    }
}

// ---- cycle_a / cycle_b -----------------------------------------------------

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CycleState {
    pub runs: u32,
}

macro_rules! cycle_kind {
    ($name:ident, $kind:literal, $peer:literal) => {
        /// Half of a mutual-dependency pair; only constructible via restore
        pub struct $name {
            identifier: Identifier,
            runs: u32,
        }

        impl TypedProcess for $name {
            const KIND: &'static str = $kind;
            type State = CycleState;
            type Api = u32;
            type Deps = ();

            fn create(
                _pid: Pid,
                identifier: &Identifier,
                _args: &[String],
            ) -> Result<Self, colony_kernel::ProcessError> {
                Ok(Self {
                    identifier: identifier.clone(),
                    runs: 0,
                })
            }

            fn decode(_pid: Pid, identifier: &Identifier, state: Self::State) -> Self {
                Self {
                    identifier: identifier.clone(),
                    runs: state.runs,
                }
            }

            fn encode(&self) -> Self::State {
                CycleState { runs: self.runs }
            }

            fn identifier(&self) -> &Identifier {
                &self.identifier
            }

            fn dependencies(_identifier: &Identifier) -> Vec<ProcessSpecifier> {
                vec![ProcessSpecifier::singleton($peer)]
            }

            fn extract(&self, data: &DependencyData) -> Option<Self::Deps> {
                data.raw(&ProcessSpecifier::singleton($peer)).map(|_| ())
            }

            fn run(&mut self, _deps: Self::Deps) -> Result<Option<Self::Api>, ProcessFault> {
                self.runs += 1;
                Ok(Some(self.runs))
            }
        }
    };
}

cycle_kind!(CycleA, "cycle_a", "cycle_b");
cycle_kind!(CycleB, "cycle_b", "cycle_a");
