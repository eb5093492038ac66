use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::properties::KEY_SEED;
use crate::config::{ConfigStore, FatalError, WorkerConfig, validate};
use crate::error::SignServerError;
use crate::signing::{CryptoToken, KeyProvider, TokenStatus};

use super::{WorkerId, WorkerIdentifier, WorkerType};

/// Fatal error reported by a worker that was added but never reloaded.
pub const NOT_LOADED_ERROR: &str = "Worker configuration has not been loaded.";

/// Where a worker stands between `add` and `remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerLifecycle {
    PendingValidation,
    Ready,
    Misconfigured,
}

/// Outcome of one reload, published atomically as a whole.
#[derive(Debug)]
struct PublishedState {
    config: WorkerConfig,
    fatal_errors: Vec<FatalError>,
    token: CryptoToken,
    generation: u64,
}

impl PublishedState {
    fn pending() -> Self {
        Self {
            config: WorkerConfig::new(),
            fatal_errors: vec![NOT_LOADED_ERROR.to_string()],
            token: CryptoToken::offline(),
            generation: 0,
        }
    }
}

#[derive(Debug)]
struct WorkerEntry {
    id: WorkerId,
    name: Arc<str>,
    worker_type: WorkerType,
    reload_lock: Mutex<()>,
    published: RwLock<Arc<PublishedState>>,
}

impl WorkerEntry {
    fn handle(&self) -> WorkerHandle {
        let state = self
            .published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        WorkerHandle {
            id: self.id,
            name: self.name.clone(),
            worker_type: self.worker_type,
            state,
        }
    }
}

/// Point-in-time view of a worker as of its last reload.
///
/// Holding a handle never blocks writers; a reload that lands afterwards
/// is simply not visible through it.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    id: WorkerId,
    name: Arc<str>,
    worker_type: WorkerType,
    state: Arc<PublishedState>,
}

impl WorkerHandle {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn worker_type(&self) -> WorkerType {
        self.worker_type
    }

    /// The committed configuration validated by the last reload.
    pub fn config(&self) -> &WorkerConfig {
        &self.state.config
    }

    pub fn fatal_errors(&self) -> &[FatalError] {
        &self.state.fatal_errors
    }

    pub fn token(&self) -> &CryptoToken {
        &self.state.token
    }

    pub fn token_status(&self) -> TokenStatus {
        self.state.token.status()
    }

    /// Number of reloads published so far; 0 before the first one.
    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    pub fn lifecycle(&self) -> WorkerLifecycle {
        if self.state.generation == 0 {
            WorkerLifecycle::PendingValidation
        } else if self.state.fatal_errors.is_empty() {
            WorkerLifecycle::Ready
        } else {
            WorkerLifecycle::Misconfigured
        }
    }
}

#[derive(Debug, Default)]
struct Directory {
    by_id: HashMap<WorkerId, Arc<WorkerEntry>>,
    by_name: HashMap<Arc<str>, WorkerId>,
}

/// Maps worker identities to independently synchronised worker records.
///
/// The directory lock only guards membership; each worker carries its own
/// reload lock and published state, so work on one worker never waits on
/// another.
pub struct WorkerRegistry {
    directory: RwLock<Directory>,
    configs: ConfigStore,
    key_provider: Arc<dyn KeyProvider>,
}

impl WorkerRegistry {
    pub fn new(key_provider: Arc<dyn KeyProvider>) -> Self {
        Self {
            directory: RwLock::new(Directory::default()),
            configs: ConfigStore::new(),
            key_provider,
        }
    }

    /// Staged configuration of every registered worker.
    pub fn configs(&self) -> &ConfigStore {
        &self.configs
    }

    /// Registers a worker.
    ///
    /// With `auto_configure` the worker gets a generated key seed and is
    /// reloaded straight away; otherwise it stays pending until the caller
    /// stages its properties and reloads.
    pub fn add(
        &self,
        id: WorkerId,
        worker_type: WorkerType,
        name: &str,
        auto_configure: bool,
    ) -> Result<WorkerHandle, SignServerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SignServerError::InvalidRequest("worker name must not be empty".into()));
        }
        if name.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SignServerError::InvalidRequest(format!(
                "worker name {name} would be ambiguous with a worker id"
            )));
        }

        let entry = {
            let mut directory = self.directory.write().unwrap_or_else(PoisonError::into_inner);
            if directory.by_id.contains_key(&id) {
                return Err(SignServerError::DuplicateWorker(id.into()));
            }
            if directory.by_name.contains_key(name) {
                return Err(SignServerError::DuplicateWorker(WorkerIdentifier::Name(name.to_string())));
            }

            let initial = if auto_configure {
                WorkerConfig::new().with(KEY_SEED, &generated_seed(id, name))
            } else {
                WorkerConfig::new()
            };
            self.configs.register(id, initial)?;

            let entry = Arc::new(WorkerEntry {
                id,
                name: Arc::from(name),
                worker_type,
                reload_lock: Mutex::new(()),
                published: RwLock::new(Arc::new(PublishedState::pending())),
            });
            directory.by_name.insert(entry.name.clone(), id);
            directory.by_id.insert(id, entry.clone());
            entry
        };

        info!(worker_id = %id, name = %name, worker_type = %worker_type, auto_configure, "Added worker");

        if auto_configure {
            self.reload(id)
        } else {
            Ok(entry.handle())
        }
    }

    /// Drops every piece of state held for `id`.
    pub fn remove(&self, id: WorkerId) -> Result<(), SignServerError> {
        let mut directory = self.directory.write().unwrap_or_else(PoisonError::into_inner);
        let entry = directory
            .by_id
            .remove(&id)
            .ok_or_else(|| SignServerError::UnknownWorker(id.into()))?;
        directory.by_name.remove(&entry.name);
        self.configs.unregister(id);
        drop(directory);

        info!(worker_id = %id, name = %entry.name, "Removed worker");
        Ok(())
    }

    /// Commits the staged configuration of `id`, re-validates it and
    /// publishes the result.
    ///
    /// Validation problems are recorded as fatal errors, never returned as
    /// `Err`. Readers see either the previous or the new state.
    pub fn reload(&self, id: WorkerId) -> Result<WorkerHandle, SignServerError> {
        let entry = self.entry(id)?;
        let _reloading = entry.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let config = self.configs.snapshot(id)?;
        let fatal_errors = validate(&config, entry.worker_type.capabilities());
        let token = CryptoToken::activate(self.key_provider.as_ref(), &entry.name, &config);

        let generation = {
            let mut published = entry.published.write().unwrap_or_else(PoisonError::into_inner);
            let generation = published.generation + 1;
            *published = Arc::new(PublishedState {
                config,
                fatal_errors,
                token,
                generation,
            });
            generation
        };

        let handle = entry.handle();
        if handle.fatal_errors().is_empty() {
            info!(worker_id = %id, generation, token = ?handle.token_status(), "Reloaded worker configuration");
        } else {
            warn!(
                worker_id = %id,
                generation,
                fatal_errors = ?handle.fatal_errors(),
                "Reloaded worker configuration with fatal errors"
            );
        }
        Ok(handle)
    }

    /// Looks a worker up by id or name.
    pub fn resolve(&self, worker: &WorkerIdentifier) -> Result<WorkerHandle, SignServerError> {
        let id = self.resolve_id(worker)?;
        Ok(self.entry(id)?.handle())
    }

    pub fn resolve_id(&self, worker: &WorkerIdentifier) -> Result<WorkerId, SignServerError> {
        let directory = self.directory.read().unwrap_or_else(PoisonError::into_inner);
        let id = match worker {
            WorkerIdentifier::Id(id) => directory.by_id.contains_key(id).then_some(*id),
            WorkerIdentifier::Name(name) => directory.by_name.get(name.as_str()).copied(),
        };
        id.ok_or_else(|| SignServerError::UnknownWorker(worker.clone()))
    }

    /// Registered worker ids in ascending order.
    pub fn list(&self) -> Vec<WorkerId> {
        let directory = self.directory.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<WorkerId> = directory.by_id.keys().copied().collect();
        ids.sort();
        ids
    }

    fn entry(&self, id: WorkerId) -> Result<Arc<WorkerEntry>, SignServerError> {
        self.directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| SignServerError::UnknownWorker(id.into()))
    }
}

fn generated_seed(id: WorkerId, name: &str) -> String {
    let digest = Sha256::digest(format!("{id}:{name}").as_bytes());
    hex::encode(digest)
}
