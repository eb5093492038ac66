use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};

use crate::config::properties::INCLUDE_CERTIFICATE_LEVELS;
use crate::error::SignServerError;
use crate::signing::{CryptoSigner, SignerCertificate};
use crate::worker::{WorkerHandle, WorkerIdentifier, WorkerRegistry};

/// A document to sign. `request_id` is opaque to the engine and echoed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub request_id: i32,
    pub payload: Vec<u8>,
}

impl SignRequest {
    pub fn new(request_id: i32, payload: impl Into<Vec<u8>>) -> Self {
        Self { request_id, payload: payload.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignResponse {
    pub request_id: i32,
    pub signed_payload: Vec<u8>,
    pub signer_certificate: SignerCertificate,
    /// The certificate chain, cut to the worker's certificate levels.
    pub certificate_chain: Vec<SignerCertificate>,
}

/// Routes sign requests to workers and refuses misconfigured ones.
///
/// Resolve and guard work on a snapshot of the worker taken up front, so no
/// worker lock is held while the signer runs and a reload racing with an
/// in-flight request cannot change what that request is signed under.
#[derive(Clone)]
pub struct SigningDispatcher {
    registry: Arc<WorkerRegistry>,
}

impl SigningDispatcher {
    pub fn new(registry: Arc<WorkerRegistry>) -> Self {
        Self { registry }
    }

    pub async fn process(
        &self,
        worker: &WorkerIdentifier,
        request: SignRequest,
    ) -> Result<SignResponse, SignServerError> {
        let handle = self.registry.resolve(worker)?;
        let (signer, signer_certificate) = guard(&handle)?;

        debug!(
            worker_id = %handle.id(),
            request_id = request.request_id,
            bytes = request.payload.len(),
            "Dispatching sign request"
        );

        let format = handle.worker_type().document_format();
        let SignRequest { request_id, payload } = request;
        let signed_payload = tokio::task::spawn_blocking(move || {
            format.sign_document(&payload, signer.as_ref())
        })
        .await
        .context("signing task did not complete")
        .map_err(SignServerError::SigningBackend)?
        .map_err(SignServerError::SigningBackend)?;

        Ok(SignResponse {
            request_id,
            signed_payload,
            signer_certificate,
            certificate_chain: response_chain(&handle),
        })
    }
}

/// Fail-closed check run before any signing work is started.
fn guard(handle: &WorkerHandle) -> Result<(Arc<dyn CryptoSigner>, SignerCertificate), SignServerError> {
    if !handle.fatal_errors().is_empty() {
        warn!(
            worker_id = %handle.id(),
            fatal_errors = ?handle.fatal_errors(),
            "Refusing to sign with misconfigured worker"
        );
        return Err(SignServerError::Misconfigured {
            worker: handle.name().to_string(),
            errors: handle.fatal_errors().to_vec(),
        });
    }

    let token = handle.token();
    match (token.signer(), token.signer_certificate()) {
        (Some(signer), Some(certificate)) => Ok((signer.clone(), certificate.clone())),
        _ => {
            warn!(worker_id = %handle.id(), "Refusing to sign with offline crypto token");
            Err(SignServerError::CryptoTokenOffline(handle.name().to_string()))
        }
    }
}

fn response_chain(handle: &WorkerHandle) -> Vec<SignerCertificate> {
    let chain = handle.token().certificate_chain();
    let levels = if handle.worker_type().capabilities().supports_certificate_levels() {
        handle
            .config()
            .get(INCLUDE_CERTIFICATE_LEVELS)
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(chain.len())
    } else {
        chain.len()
    };
    chain.iter().take(levels).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::properties::KEY_SEED;
    use crate::document::SignedEnvelope;
    use crate::signing::SeedKeyProvider;
    use crate::worker::{WorkerId, WorkerType};

    const ID: WorkerId = WorkerId::new(5678);

    fn setup(worker_type: WorkerType) -> (Arc<WorkerRegistry>, SigningDispatcher) {
        let registry = Arc::new(WorkerRegistry::new(Arc::new(SeedKeyProvider)));
        registry.add(ID, worker_type, "Signer", true).unwrap();
        let dispatcher = SigningDispatcher::new(registry.clone());
        (registry, dispatcher)
    }

    #[tokio::test]
    async fn signs_with_ready_worker() {
        let (_registry, dispatcher) = setup(WorkerType::DocumentSigner);
        let response = dispatcher
            .process(&ID.into(), SignRequest::new(13, b"document".to_vec()))
            .await
            .unwrap();

        assert_eq!(response.request_id, 13);
        let envelope: SignedEnvelope = serde_json::from_slice(&response.signed_payload).unwrap();
        assert_eq!(hex::decode(envelope.document).unwrap(), b"document");
        assert_eq!(response.signer_certificate.subject, "CN=Signer");
        assert_eq!(response.certificate_chain, vec![response.signer_certificate.clone()]);
    }

    #[tokio::test]
    async fn pending_worker_is_refused() {
        let registry = Arc::new(WorkerRegistry::new(Arc::new(SeedKeyProvider)));
        registry.add(ID, WorkerType::DocumentSigner, "Signer", false).unwrap();
        registry.configs().set(ID, KEY_SEED, "seed").unwrap();
        let dispatcher = SigningDispatcher::new(registry.clone());

        let error = dispatcher
            .process(&ID.into(), SignRequest::new(1, b"doc".to_vec()))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("Worker is misconfigured"));
    }

    #[tokio::test]
    async fn unknown_worker_is_refused() {
        let (_registry, dispatcher) = setup(WorkerType::DocumentSigner);
        let error = dispatcher
            .process(&"Nobody".into(), SignRequest::new(1, b"doc".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(error, SignServerError::UnknownWorker(_)));
    }

    #[tokio::test]
    async fn certificate_levels_cut_the_chain() {
        let (registry, dispatcher) = setup(WorkerType::DetachedSigner);
        registry.configs().set(ID, INCLUDE_CERTIFICATE_LEVELS, "0").unwrap();
        registry.reload(ID).unwrap();

        let response = dispatcher
            .process(&ID.into(), SignRequest::new(7, b"doc".to_vec()))
            .await
            .unwrap();
        assert!(response.certificate_chain.is_empty());
        assert_eq!(response.signer_certificate.algorithm, "secp256k1");
        assert_eq!(response.signed_payload.len(), 64);
    }
}
