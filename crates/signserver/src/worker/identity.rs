use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SignServerError;

/// Numeric worker id, unique within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(u32);

impl WorkerId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for WorkerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// How a caller refers to a worker: by id or by its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkerIdentifier {
    Id(WorkerId),
    Name(String),
}

impl fmt::Display for WorkerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => id.fmt(f),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<WorkerId> for WorkerIdentifier {
    fn from(id: WorkerId) -> Self {
        Self::Id(id)
    }
}

impl From<u32> for WorkerIdentifier {
    fn from(id: u32) -> Self {
        Self::Id(WorkerId(id))
    }
}

impl From<&str> for WorkerIdentifier {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// All-digit input is an id, anything else a name.
impl FromStr for WorkerIdentifier {
    type Err = SignServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SignServerError::InvalidRequest(
                "worker identifier must not be empty".into(),
            ));
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let id = s.parse::<u32>().map_err(|e| {
                SignServerError::InvalidRequest(format!("worker id {s} out of range: {e}"))
            })?;
            return Ok(Self::Id(WorkerId(id)));
        }
        Ok(Self::Name(s.to_string()))
    }
}
