/*!
 * Persistence Adapter
 *
 * Wire codec for the process table and the seam to the durable store. The
 * table is one JSON document: an array of records `{t, i, n, r, s}` plus any
 * type-specific fields a newer deployment may have written - unknown fields
 * and unknown kinds are preserved verbatim, never dropped, so deployments
 * that add or remove process kinds can round-trip each other's tables.
 */

use crate::core::types::Pid;
use crate::process::Identifier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Store key holding the persisted process table
pub const PROCESS_TABLE_KEY: &str = "os.processes";

/// Store key holding the next PID to allocate (never reused, so it outlives
/// every record that ever carried it)
pub const NEXT_PID_KEY: &str = "os.next_pid";

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("serialization failed: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("malformed table document: {0}")]
    MalformedTable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Durable store transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("store failure: {0}")]
pub struct StoreError(pub String);

/// One persisted process record, decoded only as far as the kernel needs
///
/// `state` stays an opaque payload until the registry decodes it; records
/// with an unrecognized `t` keep their full raw shape in quarantine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    #[serde(rename = "t")]
    pub kind: String,

    #[serde(rename = "i")]
    pub pid: Pid,

    #[serde(rename = "n", default, skip_serializing_if = "is_default_identifier")]
    pub identifier: Identifier,

    #[serde(rename = "r", default = "default_running", skip_serializing_if = "is_true")]
    pub running: bool,

    #[serde(rename = "s", default, skip_serializing_if = "Value::is_null")]
    pub state: Value,

    /// Fields written by a deployment this build does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_running() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_default_identifier(identifier: &Identifier) -> bool {
    matches!(identifier, Identifier::Default)
}

impl RawRecord {
    pub fn new(kind: impl Into<String>, pid: Pid, identifier: Identifier) -> Self {
        Self {
            kind: kind.into(),
            pid,
            identifier,
            running: true,
            state: Value::Null,
            extra: Map::new(),
        }
    }
}

/// Encode the process table into its single-document wire form
pub fn encode_table(records: &[RawRecord]) -> Result<String, PersistError> {
    Ok(serde_json::to_string(records)?)
}

/// Decode a persisted table document
pub fn decode_table(document: &str) -> Result<Vec<RawRecord>, PersistError> {
    if document.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(document).map_err(|err| {
        PersistError::MalformedTable(format!("{err}"))
    })
}

/// The only state surviving between ticks
///
/// The low-level transport is out of scope; hosts implement this seam over
/// whatever key-value storage they have.
pub trait DurableStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&mut self, key: &str, document: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and embedded use
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    documents: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.documents.get(key).cloned())
    }

    fn save(&mut self, key: &str, document: &str) -> Result<(), StoreError> {
        self.documents.insert(key.to_string(), document.to_string());
        Ok(())
    }
}
