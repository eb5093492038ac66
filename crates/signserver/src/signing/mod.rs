mod signer;
mod secp256k1;
mod rsa;
mod token;

pub use signer::CryptoSigner;
pub use secp256k1::Secp256k1Signer;
pub use self::rsa::RsaSigner;
pub use token::{CryptoToken, KeyProvider, SeedKeyProvider, SignerCertificate, TokenStatus};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Values accepted for the `SIGNING_ALGORITHM` property.
pub const SUPPORTED_ALGORITHMS: &[&str] = &["secp256k1", "rsa"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningAlgorithm {
    #[default]
    Secp256k1,
    Rsa,
}

impl SigningAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            Self::Secp256k1 => "secp256k1",
            Self::Rsa => "rsa",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secp256k1" => Ok(Self::Secp256k1),
            "rsa" => Ok(Self::Rsa),
            other => anyhow::bail!("unsupported signing algorithm: {other}"),
        }
    }
}
