use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tracing::info;

use crate::api::{AddWorkerRequest, ProcessRequest, ProcessResponse, PropertyValue, WorkerList};
use crate::dispatch::SigningDispatcher;
use crate::error::SignServerError;
use crate::status::{StatusReporter, WorkerStatus};
use crate::worker::{WorkerIdentifier, WorkerRegistry};

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<WorkerRegistry>,
    pub dispatcher: SigningDispatcher,
    pub reporter: StatusReporter,
}

impl AppState {
    pub fn new(registry: Arc<WorkerRegistry>) -> Self {
        Self {
            dispatcher: SigningDispatcher::new(registry.clone()),
            reporter: StatusReporter::new(registry.clone()),
            registry,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(|| async move { (StatusCode::OK, "Ok").into_response() }))
        .route("/workers", get(list_workers).post(add_worker))
        .route("/workers/{worker}", delete(remove_worker))
        .route("/workers/{worker}/status", get(worker_status))
        .route("/workers/{worker}/reload", post(reload_worker))
        .route("/workers/{worker}/process", post(process))
        .route(
            "/workers/{worker}/properties/{key}",
            put(set_property).get(get_property).delete(remove_property),
        )
        .with_state(state)
}

pub async fn run(host: &str, port: u16, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("binding {host}:{port}"))?;
    info!(addr = %listener.local_addr()?, "SignServer listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("serving HTTP")?;

    Ok(())
}

async fn list_workers(State(state): State<AppState>) -> Json<WorkerList> {
    Json(WorkerList { workers: state.registry.list() })
}

async fn add_worker(
    State(state): State<AppState>,
    Json(request): Json<AddWorkerRequest>,
) -> Result<impl IntoResponse, SignServerError> {
    let AddWorkerRequest { id, name, worker_type, auto_configure } = request;
    let handle = with_registry(&state, move |registry| {
        registry.add(id, worker_type, &name, auto_configure)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(WorkerStatus::from(&handle))))
}

async fn remove_worker(
    State(state): State<AppState>,
    Path(worker): Path<String>,
) -> Result<StatusCode, SignServerError> {
    let id = state.registry.resolve_id(&worker.parse()?)?;
    state.registry.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn worker_status(
    State(state): State<AppState>,
    Path(worker): Path<String>,
) -> Result<Json<WorkerStatus>, SignServerError> {
    let worker: WorkerIdentifier = worker.parse()?;
    Ok(Json(state.reporter.status(&worker)?))
}

async fn reload_worker(
    State(state): State<AppState>,
    Path(worker): Path<String>,
) -> Result<Json<WorkerStatus>, SignServerError> {
    let id = state.registry.resolve_id(&worker.parse()?)?;
    let handle = with_registry(&state, move |registry| registry.reload(id)).await?;
    Ok(Json(WorkerStatus::from(&handle)))
}

/// Runs a registry call that may activate a crypto token on the blocking pool.
async fn with_registry<T, F>(state: &AppState, call: F) -> Result<T, SignServerError>
where
    F: FnOnce(&WorkerRegistry) -> Result<T, SignServerError> + Send + 'static,
    T: Send + 'static,
{
    let registry = state.registry.clone();
    tokio::task::spawn_blocking(move || call(&registry))
        .await
        .context("registry task did not complete")
        .map_err(SignServerError::SigningBackend)?
}

async fn get_property(
    State(state): State<AppState>,
    Path((worker, key)): Path<(String, String)>,
) -> Result<Json<PropertyValue>, SignServerError> {
    let id = state.registry.resolve_id(&worker.parse()?)?;
    let value = state.registry.configs().get(id, &key)?;
    Ok(Json(PropertyValue { key: key.to_ascii_uppercase(), value }))
}

async fn set_property(
    State(state): State<AppState>,
    Path((worker, key)): Path<(String, String)>,
    value: String,
) -> Result<StatusCode, SignServerError> {
    let id = state.registry.resolve_id(&worker.parse()?)?;
    state.registry.configs().set(id, &key, &value)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_property(
    State(state): State<AppState>,
    Path((worker, key)): Path<(String, String)>,
) -> Result<Json<PropertyValue>, SignServerError> {
    let id = state.registry.resolve_id(&worker.parse()?)?;
    let value = state.registry.configs().remove(id, &key)?;
    Ok(Json(PropertyValue { key: key.to_ascii_uppercase(), value }))
}

async fn process(
    State(state): State<AppState>,
    Path(worker): Path<String>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, SignServerError> {
    let worker: WorkerIdentifier = worker.parse()?;
    let response = state.dispatcher.process(&worker, request.into()).await?;
    Ok(Json(response.into()))
}
