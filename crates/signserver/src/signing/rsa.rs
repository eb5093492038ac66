use anyhow::{Context, Result};
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::SeedableRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::{Digest, Sha256};

use super::signer::CryptoSigner;

const RSA_KEY_BITS: usize = 2048;

/// RSA PKCS#1 v1.5 signer with SHA-256 digest.
///
/// The SHA-256 hash of the seed seeds a deterministic CSPRNG used for key
/// generation, so the same seed always yields the same key pair.
pub struct RsaSigner {
    signing_key: SigningKey<Sha256>,
    public_key_der: Vec<u8>,
}

impl RsaSigner {
    pub fn from_seed(seed: &str) -> Result<Self> {
        let hash = Sha256::digest(seed.as_bytes());
        let mut rng = ChaCha20Rng::from_seed(hash.into());
        let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .context("generating RSA key from seed")?;
        let public_key_der = private_key
            .to_public_key()
            .to_public_key_der()
            .context("encoding RSA public key to DER")?
            .into_vec();
        let signing_key = SigningKey::<Sha256>::new(private_key);
        Ok(Self { signing_key, public_key_der })
    }
}

impl CryptoSigner for RsaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .signing_key
            .try_sign(data)
            .context("RSA signing failed")?;
        Ok(signature.to_vec())
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key_der.clone()
    }

    fn algorithm(&self) -> &str {
        "rsa"
    }
}
