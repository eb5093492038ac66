use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::DocumentFormat;
use crate::signing::CryptoSigner;

/// Signed document as emitted by [`EnvelopeFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub format: String,
    /// Hex-encoded original document.
    pub document: String,
    /// Hex-encoded SHA-256 of the document.
    pub digest: String,
    pub signature: String,
    pub algorithm: String,
}

/// Wraps the document and its signature in a JSON envelope.
pub struct EnvelopeFormat;

impl DocumentFormat for EnvelopeFormat {
    fn sign_document(&self, document: &[u8], signer: &dyn CryptoSigner) -> Result<Vec<u8>> {
        let digest = Sha256::digest(document);
        let signature = signer.sign(document).context("signing document")?;

        let envelope = SignedEnvelope {
            format: self.name().to_string(),
            document: hex::encode(document),
            digest: hex::encode(digest),
            signature: hex::encode(signature),
            algorithm: signer.algorithm().to_string(),
        };
        serde_json::to_vec(&envelope).context("serializing signed envelope")
    }

    fn name(&self) -> &str {
        "envelope"
    }
}
