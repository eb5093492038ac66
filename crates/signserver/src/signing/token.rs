use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::WorkerConfig;
use crate::config::properties::{CERTIFICATE_SUBJECT, KEY_SEED, SIGNING_ALGORITHM};

use super::{CryptoSigner, RsaSigner, Secp256k1Signer, SigningAlgorithm};

/// Whether a worker's key material is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    Active,
    Offline,
}

/// Identity of the key a worker signs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerCertificate {
    pub subject: String,
    pub algorithm: String,
    #[serde(with = "hex")]
    pub public_key: Vec<u8>,
}

/// Source of worker key material.
///
/// Activation happens on every reload against the freshly committed
/// configuration.
pub trait KeyProvider: Send + Sync {
    fn activate(&self, worker_name: &str, config: &WorkerConfig) -> Result<Arc<dyn CryptoSigner>>;
}

/// Derives keys from the `KEY_SEED` and `SIGNING_ALGORITHM` properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedKeyProvider;

impl KeyProvider for SeedKeyProvider {
    fn activate(&self, _worker_name: &str, config: &WorkerConfig) -> Result<Arc<dyn CryptoSigner>> {
        let seed = config
            .get(KEY_SEED)
            .with_context(|| format!("no {KEY_SEED} configured"))?;
        let algorithm = config
            .get(SIGNING_ALGORITHM)
            .map(str::parse::<SigningAlgorithm>)
            .transpose()?
            .unwrap_or_default();

        let signer: Arc<dyn CryptoSigner> = match algorithm {
            SigningAlgorithm::Secp256k1 => Arc::new(Secp256k1Signer::from_seed(seed)?),
            SigningAlgorithm::Rsa => Arc::new(RsaSigner::from_seed(seed)?),
        };
        Ok(signer)
    }
}

/// A worker's activated (or failed) key material plus its certificate chain.
#[derive(Clone)]
pub struct CryptoToken {
    signer: Option<Arc<dyn CryptoSigner>>,
    chain: Vec<SignerCertificate>,
}

impl CryptoToken {
    pub fn offline() -> Self {
        Self { signer: None, chain: Vec::new() }
    }

    /// Activates the token, falling back to offline when the provider fails.
    pub fn activate(provider: &dyn KeyProvider, worker_name: &str, config: &WorkerConfig) -> Self {
        match provider.activate(worker_name, config) {
            Ok(signer) => {
                let subject = config
                    .get(CERTIFICATE_SUBJECT)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("CN={worker_name}"));
                let certificate = SignerCertificate {
                    subject,
                    algorithm: signer.algorithm().to_string(),
                    public_key: signer.public_key_bytes(),
                };
                Self { signer: Some(signer), chain: vec![certificate] }
            }
            Err(error) => {
                warn!(worker = %worker_name, error = %format!("{error:#}"), "Crypto token activation failed");
                Self::offline()
            }
        }
    }

    pub fn status(&self) -> TokenStatus {
        if self.signer.is_some() {
            TokenStatus::Active
        } else {
            TokenStatus::Offline
        }
    }

    pub fn signer(&self) -> Option<&Arc<dyn CryptoSigner>> {
        self.signer.as_ref()
    }

    pub fn signer_certificate(&self) -> Option<&SignerCertificate> {
        self.chain.first()
    }

    /// Signer certificate first, then its issuers.
    pub fn certificate_chain(&self) -> &[SignerCertificate] {
        &self.chain
    }
}

impl fmt::Debug for CryptoToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoToken")
            .field("status", &self.status())
            .field("chain", &self.chain)
            .finish()
    }
}
