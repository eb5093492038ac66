//! Wire types of the HTTP surface, shared with the admin client.

use serde::{Deserialize, Serialize};

use crate::dispatch::{SignRequest, SignResponse};
use crate::signing::SignerCertificate;
use crate::worker::{WorkerId, WorkerType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddWorkerRequest {
    pub id: WorkerId,
    pub name: String,
    #[serde(rename = "type")]
    pub worker_type: WorkerType,
    #[serde(default)]
    pub auto_configure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerList {
    pub workers: Vec<WorkerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub request_id: i32,
    #[serde(with = "hex")]
    pub payload: Vec<u8>,
}

impl From<ProcessRequest> for SignRequest {
    fn from(request: ProcessRequest) -> Self {
        SignRequest::new(request.request_id, request.payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub request_id: i32,
    #[serde(with = "hex")]
    pub signed_payload: Vec<u8>,
    pub signer_certificate: SignerCertificate,
    pub certificate_chain: Vec<SignerCertificate>,
}

impl From<SignResponse> for ProcessResponse {
    fn from(response: SignResponse) -> Self {
        Self {
            request_id: response.request_id,
            signed_payload: response.signed_payload,
            signer_certificate: response.signer_certificate,
            certificate_chain: response.certificate_chain,
        }
    }
}
