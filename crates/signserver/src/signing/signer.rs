/// Key material a worker signs with.
///
/// Implementations are sync since signing is CPU-bound; the dispatcher runs
/// them on the blocking pool so a slow backend (e.g. an HSM) never stalls
/// the async runtime.
pub trait CryptoSigner: Send + Sync {
    /// Sign `data`. Returns raw signature bytes.
    fn sign(&self, data: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Encoded public key (e.g. 33 bytes for compressed secp256k1).
    fn public_key_bytes(&self) -> Vec<u8>;

    /// Algorithm identifier string (e.g. "secp256k1").
    fn algorithm(&self) -> &str;
}
