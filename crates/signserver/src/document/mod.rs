mod envelope;
mod detached;

pub use envelope::{EnvelopeFormat, SignedEnvelope};
pub use detached::DetachedFormat;

use crate::signing::CryptoSigner;

/// Turns a raw document into its signed representation.
///
/// The format owns parsing and re-serialization of the container; the
/// signer only ever sees the bytes the format decides to sign.
pub trait DocumentFormat: Send + Sync {
    fn sign_document(&self, document: &[u8], signer: &dyn CryptoSigner) -> anyhow::Result<Vec<u8>>;

    /// Format name (e.g. "envelope", "detached").
    fn name(&self) -> &str;
}
