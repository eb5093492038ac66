//! HTTP client for the signserver admin and signing routes.

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use serde::de::DeserializeOwned;

use signserver::api::{AddWorkerRequest, ProcessRequest, ProcessResponse, PropertyValue, WorkerList};
use signserver::{WorkerId, WorkerStatus, WorkerType};

/// Characters left as is inside one path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Builds `/workers/<worker>[/<segment>..]` with every segment percent-encoded.
fn worker_path(worker: &str, rest: &[&str]) -> String {
    std::iter::once(worker)
        .chain(rest.iter().copied())
        .fold(String::from("/workers"), |mut path, segment| {
            path.push('/');
            path.extend(utf8_percent_encode(segment, PATH_SEGMENT));
            path
        })
}

pub struct SignServerClient {
    base_url: String,
    http: Client<HttpConnector, Full<Bytes>>,
}

impl SignServerClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: &str) -> Self {
        let http = Client::builder(TokioExecutor::new()).build_http();
        Self { base_url: base_url.trim_end_matches('/').to_string(), http }
    }

    pub async fn list(&self) -> Result<Vec<WorkerId>> {
        let list: WorkerList = self.json(Method::GET, "/workers", None::<&()>).await?;
        Ok(list.workers)
    }

    pub async fn add(
        &self,
        id: WorkerId,
        name: &str,
        worker_type: WorkerType,
        auto_configure: bool,
    ) -> Result<WorkerStatus> {
        let request = AddWorkerRequest {
            id,
            name: name.to_string(),
            worker_type,
            auto_configure,
        };
        self.json(Method::POST, "/workers", Some(&request)).await
    }

    pub async fn remove(&self, worker: &str) -> Result<()> {
        self.send(Method::DELETE, &worker_path(worker, &[]), Bytes::new(), None)
            .await?;
        Ok(())
    }

    pub async fn status(&self, worker: &str) -> Result<WorkerStatus> {
        self.json(Method::GET, &worker_path(worker, &["status"]), None::<&()>)
            .await
    }

    pub async fn reload(&self, worker: &str) -> Result<WorkerStatus> {
        self.json(Method::POST, &worker_path(worker, &["reload"]), None::<&()>)
            .await
    }

    pub async fn get_property(&self, worker: &str, key: &str) -> Result<PropertyValue> {
        self.json(
            Method::GET,
            &worker_path(worker, &["properties", key]),
            None::<&()>,
        )
        .await
    }

    /// Stages a property. Takes effect on the next reload.
    pub async fn set_property(&self, worker: &str, key: &str, value: &str) -> Result<()> {
        self.send(
            Method::PUT,
            &worker_path(worker, &["properties", key]),
            Bytes::from(value.to_string()),
            Some("text/plain"),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_property(&self, worker: &str, key: &str) -> Result<PropertyValue> {
        self.json(
            Method::DELETE,
            &worker_path(worker, &["properties", key]),
            None::<&()>,
        )
        .await
    }

    pub async fn process(
        &self,
        worker: &str,
        request_id: i32,
        payload: Vec<u8>,
    ) -> Result<ProcessResponse> {
        let request = ProcessRequest { request_id, payload };
        self.json(Method::POST, &worker_path(worker, &["process"]), Some(&request))
            .await
    }

    async fn json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let (body, content_type) = match body {
            Some(body) => (
                Bytes::from(serde_json::to_vec(body).context("encoding request body")?),
                Some("application/json"),
            ),
            None => (Bytes::new(), None),
        };
        let bytes = self.send(method, path, body, content_type).await?;
        serde_json::from_slice(&bytes).with_context(|| format!("decoding response from {path}"))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<Bytes> {
        let request = self.request(method, path, body, content_type)?;
        let response = self
            .http
            .request(request)
            .await
            .with_context(|| format!("sending request to {path}"))?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .context("reading response body")?
            .to_bytes();

        if !status.is_success() {
            bail!("{}", error_message(status, &bytes));
        }
        Ok(bytes)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<Request<Full<Bytes>>> {
        let mut request = Request::builder()
            .method(method)
            .uri(format!("{}{path}", self.base_url));
        if let Some(content_type) = content_type {
            request = request.header("Content-Type", content_type);
        }
        request.body(Full::new(body)).context("building request")
    }
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) if !text.trim().is_empty() => format!("HTTP {status}: {}", text.trim()),
        _ => format!("HTTP {status}"),
    }
}
