pub mod api;
pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod server;
pub mod signing;
pub mod status;
pub mod worker;

pub use config::{ConfigStore, FatalError, WorkerConfig, validate};
pub use dispatch::{SignRequest, SignResponse, SigningDispatcher};
pub use error::SignServerError;
pub use server::{AppState, router, run};
pub use signing::{CryptoSigner, KeyProvider, SeedKeyProvider, SignerCertificate, TokenStatus};
pub use status::{StatusReporter, WorkerStatus};
pub use worker::{WorkerHandle, WorkerId, WorkerIdentifier, WorkerLifecycle, WorkerRegistry, WorkerType};
