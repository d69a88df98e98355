/*!
 * Process Types
 * Identity, dependency specifiers, and process-level errors
 */

use crate::core::types::Pid;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Process operation result
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Reserved identifier token for singleton instances
pub const DEFAULT_IDENTIFIER: &str = "default";

/// Instance identifier scoping singleton vs parameterized processes
///
/// `Default` is the unit token for process kinds that only ever have one
/// instance; `Named` carries the parameter (a room name, a shard, ...).
/// On the wire both are plain strings, `Default` spelled `"default"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Identifier {
    Default,
    Named(String),
}

impl Identifier {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Default => DEFAULT_IDENTIFIER,
            Self::Named(name) => name,
        }
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::Default
    }
}

impl From<String> for Identifier {
    fn from(raw: String) -> Self {
        if raw == DEFAULT_IDENTIFIER {
            Self::Default
        } else {
            Self::Named(raw)
        }
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> Self {
        identifier.as_str().to_string()
    }
}

impl From<&str> for Identifier {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses a concrete process by (kind, identifier)
///
/// Used both to declare a dependency and to resolve it - an exact match on
/// both fields, never a fallback to the default instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessSpecifier {
    pub kind: String,
    pub identifier: Identifier,
}

impl ProcessSpecifier {
    pub fn new(kind: impl Into<String>, identifier: impl Into<Identifier>) -> Self {
        Self {
            kind: kind.into(),
            identifier: identifier.into(),
        }
    }

    /// Specifier for a singleton process kind
    pub fn singleton(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            identifier: Identifier::Default,
        }
    }
}

impl fmt::Display for ProcessSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.identifier)
    }
}

/// Process errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessError {
    #[error("{kind}[{identifier}] already launched as PID {existing}")]
    AlreadyLaunched {
        kind: String,
        identifier: Identifier,
        existing: Pid,
    },

    #[error("lack of dependencies: {}", format_specifiers(.missing))]
    LackOfDependencies { missing: Vec<ProcessSpecifier> },

    #[error("process not found: {0}")]
    NotFound(Pid),

    #[error("unknown process kind: {0}")]
    UnknownKind(String),

    #[error("spawn failed for {kind}[{identifier}]: {reason}")]
    SpawnFailed {
        kind: String,
        identifier: Identifier,
        reason: String,
    },

    #[error("identifier \"default\" is reserved for singleton instances")]
    ReservedIdentifier,

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

/// Contained failure raised inside one process's `run`
///
/// Faults never cross the process boundary: the scheduler logs them, the
/// process yields no API for the tick, and scheduling continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ProcessFault(pub String);

impl ProcessFault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

fn format_specifiers(specifiers: &[ProcessSpecifier]) -> String {
    specifiers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
