use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use ragdesk_core::{
    Document, HealthReport, Metadata, QueryRequest, QueryResponse, RagService, StoredDocument,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Settings;
use crate::error::ApiError;
use crate::startup::build_service;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RagService>,
}

impl AppState {
    pub fn new(service: RagService) -> Self {
        Self { service: Arc::new(service) }
    }
}

/// A document as posted by clients. `metadata` may be omitted or `null`.
#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl From<DocumentRequest> for Document {
    fn from(request: DocumentRequest) -> Self {
        Document::new(request.id, request.content).with_metadata(request.metadata.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentBatchRequest {
    pub documents: Vec<DocumentRequest>,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/documents/add", post(add_document))
        .route("/documents/add-batch", post(add_documents))
        .route("/documents", get(list_documents).delete(reset_documents))
        .route("/documents/{id}", get(get_document).delete(delete_document))
        .route("/query", post(query))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .with_context(|| format!("invalid HOST/PORT: {}:{}", settings.host, settings.port))?;

    let service = build_service(&settings).await?;
    let app = app_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("ragdesk listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("ragdesk stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "ragdesk retrieval-and-answer service is running",
        "health": "/health",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthReport>, ApiError> {
    Ok(Json(state.service.health().await?))
}

async fn add_document(
    State(state): State<AppState>,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(request) = payload?;
    let receipt = state.service.add(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Document added successfully",
            "id": receipt.id,
            "total_documents": receipt.total_documents,
        })),
    ))
}

async fn add_documents(
    State(state): State<AppState>,
    payload: Result<Json<DocumentBatchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(batch) = payload?;
    let documents: Vec<Document> = batch.documents.into_iter().map(Document::from).collect();
    let receipt = state.service.add_batch(documents).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} documents added successfully", receipt.added),
            "added": receipt.added,
            "total_documents": receipt.total_documents,
        })),
    ))
}

async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.service.query(&request).await?))
}

async fn list_documents(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list_all().await?))
}

async fn get_document(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StoredDocument>, ApiError> {
    Ok(Json(state.service.get(&id).await?))
}

async fn delete_document(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let receipt = state.service.delete(&id).await?;
    Ok(Json(json!({
        "message": format!("Document {} deleted successfully", receipt.id),
        "id": receipt.id,
        "total_documents": receipt.total_documents,
    })))
}

async fn reset_documents(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.service.reset().await?;
    Ok(Json(json!({
        "message": "Database reset successfully",
        "total_documents": 0,
    })))
}
