//! Startup provisioning of workers from a JSON file.

use std::collections::BTreeMap;
use std::path::Path;

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::worker::{WorkerId, WorkerRegistry, WorkerType};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkersFile {
    #[serde(default)]
    pub workers: Vec<WorkerDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerDefinition {
    pub id: WorkerId,
    pub name: String,
    #[serde(rename = "type")]
    pub worker_type: WorkerType,
    #[serde(default)]
    pub auto_configure: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl WorkersFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading workers file {}", path.display()))?;
        Self::parse(&raw).wrap_err_with(|| format!("parsing workers file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Adds every worker, stages its properties and reloads it once.
    pub fn apply(&self, registry: &WorkerRegistry) -> Result<()> {
        for definition in &self.workers {
            let id = definition.id;
            registry
                .add(id, definition.worker_type, &definition.name, definition.auto_configure)
                .wrap_err_with(|| format!("adding worker {id}"))?;
            for (key, value) in &definition.properties {
                registry.configs().set(id, key, value)?;
            }
            let handle = registry
                .reload(id)
                .wrap_err_with(|| format!("reloading worker {id}"))?;
            info!(
                worker_id = %id,
                lifecycle = ?handle.lifecycle(),
                fatal_errors = handle.fatal_errors().len(),
                "Provisioned worker from file"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::signing::{SeedKeyProvider, TokenStatus};
    use crate::worker::WorkerLifecycle;

    const FILE: &str = r#"{
        "workers": [
            {
                "id": 5678,
                "name": "TestODFSigner",
                "type": "document-signer",
                "properties": { "KEY_SEED": "junit", "certificate_subject": "CN=TestODFSigner, O=Test" }
            },
            {
                "id": 5679,
                "name": "Detached",
                "type": "detached-signer",
                "auto_configure": true,
                "properties": { "INCLUDE_CERTIFICATE_LEVELS": "x" }
            }
        ]
    }"#;

    #[test]
    fn provisions_every_worker() {
        let registry = WorkerRegistry::new(Arc::new(SeedKeyProvider));
        WorkersFile::parse(FILE).unwrap().apply(&registry).unwrap();

        let odf = registry.resolve(&"TestODFSigner".into()).unwrap();
        assert_eq!(odf.lifecycle(), WorkerLifecycle::Ready);
        assert_eq!(odf.token_status(), TokenStatus::Active);
        assert_eq!(
            odf.token().signer_certificate().unwrap().subject,
            "CN=TestODFSigner, O=Test"
        );

        let detached = registry.resolve(&WorkerId::new(5679).into()).unwrap();
        assert_eq!(detached.lifecycle(), WorkerLifecycle::Misconfigured);
        assert_eq!(detached.generation(), 2);
    }

    #[test]
    fn duplicate_entry_aborts() {
        let raw = r#"{"workers":[
            {"id":1,"name":"a","type":"detached-signer"},
            {"id":1,"name":"b","type":"detached-signer"}
        ]}"#;
        let registry = WorkerRegistry::new(Arc::new(SeedKeyProvider));
        let error = WorkersFile::parse(raw).unwrap().apply(&registry).unwrap_err();
        assert!(format!("{error:#}").contains("adding worker 1"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(WorkersFile::parse(r#"{"workers":[],"extra":1}"#).is_err());
        assert!(WorkersFile::parse(r#"{"workers":[{"id":1,"name":"a","type":"xml-signer"}]}"#).is_err());
    }
}
