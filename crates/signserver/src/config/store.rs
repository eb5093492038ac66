use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use crate::error::SignServerError;
use crate::worker::WorkerId;

use super::WorkerConfig;

/// Staged configuration of every registered worker.
///
/// Writes land here and stay invisible to validation until the worker is
/// reloaded, which lets a caller batch several property changes and
/// re-validate once. Each worker's config sits behind its own lock; the
/// outer map is only locked long enough to find it.
#[derive(Debug, Default)]
pub struct ConfigStore {
    staged: RwLock<HashMap<WorkerId, Arc<Mutex<WorkerConfig>>>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, id: WorkerId, initial: WorkerConfig) -> Result<(), SignServerError> {
        let mut staged = self.staged.write().unwrap_or_else(PoisonError::into_inner);
        if staged.contains_key(&id) {
            return Err(SignServerError::DuplicateWorker(id.into()));
        }
        staged.insert(id, Arc::new(Mutex::new(initial)));
        Ok(())
    }

    pub(crate) fn unregister(&self, id: WorkerId) -> bool {
        self.staged
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    fn entry(&self, id: WorkerId) -> Result<Arc<Mutex<WorkerConfig>>, SignServerError> {
        self.staged
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| SignServerError::UnknownWorker(id.into()))
    }

    /// Current staged value of `key`, committed or not.
    pub fn get(&self, id: WorkerId, key: &str) -> Result<Option<String>, SignServerError> {
        let entry = self.entry(id)?;
        let config = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(config.get(key).map(str::to_string))
    }

    pub fn set(&self, id: WorkerId, key: &str, value: &str) -> Result<(), SignServerError> {
        let entry = self.entry(id)?;
        entry.lock().unwrap_or_else(PoisonError::into_inner).set(key, value);
        debug!(worker_id = %id, key, "Staged worker property");
        Ok(())
    }

    pub fn remove(&self, id: WorkerId, key: &str) -> Result<Option<String>, SignServerError> {
        let entry = self.entry(id)?;
        let previous = entry.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        debug!(worker_id = %id, key, removed = previous.is_some(), "Staged worker property removal");
        Ok(previous)
    }

    /// Copy of the staged configuration, as the next reload would see it.
    pub fn snapshot(&self, id: WorkerId) -> Result<WorkerConfig, SignServerError> {
        let entry = self.entry(id)?;
        let config = entry.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(config)
    }
}
