use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::FatalError;
use crate::error::SignServerError;
use crate::signing::TokenStatus;
use crate::worker::{WorkerHandle, WorkerId, WorkerIdentifier, WorkerLifecycle, WorkerRegistry, WorkerType};

/// Health of a worker as of its last reload.
///
/// An empty `fatal_errors` list is the "healthy" signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: WorkerId,
    pub name: String,
    pub worker_type: WorkerType,
    pub token_status: TokenStatus,
    pub lifecycle: WorkerLifecycle,
    pub fatal_errors: Vec<FatalError>,
}

impl WorkerStatus {
    pub fn is_healthy(&self) -> bool {
        self.fatal_errors.is_empty()
    }
}

impl From<&WorkerHandle> for WorkerStatus {
    fn from(handle: &WorkerHandle) -> Self {
        Self {
            worker_id: handle.id(),
            name: handle.name().to_string(),
            worker_type: handle.worker_type(),
            token_status: handle.token_status(),
            lifecycle: handle.lifecycle(),
            fatal_errors: handle.fatal_errors().to_vec(),
        }
    }
}

/// Read-only status queries. Never reloads and never mutates.
#[derive(Clone)]
pub struct StatusReporter {
    registry: Arc<WorkerRegistry>,
}

impl StatusReporter {
    pub fn new(registry: Arc<WorkerRegistry>) -> Self {
        Self { registry }
    }

    pub fn status(&self, worker: &WorkerIdentifier) -> Result<WorkerStatus, SignServerError> {
        let handle = self.registry.resolve(worker)?;
        Ok(WorkerStatus::from(&handle))
    }
}
