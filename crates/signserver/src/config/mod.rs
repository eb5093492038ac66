mod store;
mod validator;

pub use store::ConfigStore;
pub use validator::{FatalError, validate};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Names of the worker properties the engine understands.
pub mod properties {
    /// Key algorithm of the worker's crypto token (`secp256k1` or `rsa`).
    pub const SIGNING_ALGORITHM: &str = "SIGNING_ALGORITHM";
    /// Seed the worker's signing key is derived from.
    pub const KEY_SEED: &str = "KEY_SEED";
    /// Distinguished name reported in the signer certificate.
    pub const CERTIFICATE_SUBJECT: &str = "CERTIFICATE_SUBJECT";
    /// Number of certificates from the chain to include in responses.
    pub const INCLUDE_CERTIFICATE_LEVELS: &str = "INCLUDE_CERTIFICATE_LEVELS";
}

/// String-keyed property set owned by a single worker.
///
/// Keys are normalised to upper case and values are trimmed. A property
/// whose value is blank reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerConfig {
    properties: BTreeMap<String, String>,
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`, mostly useful when assembling fixtures.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .get(&normalize_key(key))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.properties
            .insert(normalize_key(key), value.trim().to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.properties.remove(&normalize_key(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for WorkerConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (key, value) in iter {
            config.set(key.as_ref(), value.as_ref());
        }
        config
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}
