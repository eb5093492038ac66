use anyhow::{Context, Result};

use super::DocumentFormat;
use crate::signing::CryptoSigner;

/// Returns the bare signature; the caller keeps the document.
pub struct DetachedFormat;

impl DocumentFormat for DetachedFormat {
    fn sign_document(&self, document: &[u8], signer: &dyn CryptoSigner) -> Result<Vec<u8>> {
        signer.sign(document).context("computing detached signature")
    }

    fn name(&self) -> &str {
        "detached"
    }
}
