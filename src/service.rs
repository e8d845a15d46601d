// src/service.rs
//! HTTP surface: axum routes over the render-to-PDF/A pipeline.
//!
//! Handlers never hold locks across awaits: they take an `Arc` snapshot of
//! the environment, registry and assembler, then run the CPU-bound pipeline
//! on the blocking pool. In dev mode every request rebuilds the snapshot
//! first so template edits show up without a restart.

use crate::config::Config;
use crate::environment::Environment;
use crate::error::PipelineError;
use crate::pdf::PdfAssembler;
use crate::renderer::render_html;
use crate::template::TemplateRegistry;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use log::{error, info};
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};

const TEMPLATE_NOT_FOUND: &str = "Template or application not found";

struct Snapshot {
    registry: Arc<TemplateRegistry>,
    assembler: Arc<PdfAssembler>,
}

pub struct AppState {
    config: Config,
    environment: RwLock<Arc<Environment>>,
    registry: RwLock<Arc<TemplateRegistry>>,
    assembler: RwLock<Arc<PdfAssembler>>,
}

impl AppState {
    pub fn initialize(config: Config) -> Result<Arc<Self>, PipelineError> {
        let environment = Arc::new(Environment::load(&config)?);
        let registry = Arc::new(TemplateRegistry::load(&config.templates_path, &environment)?);
        let assembler = Arc::new(PdfAssembler::new(Arc::clone(&environment))?);
        Ok(Arc::new(AppState {
            config,
            environment: RwLock::new(environment),
            registry: RwLock::new(registry),
            assembler: RwLock::new(assembler),
        }))
    }

    /// Rebuilds everything from disk, then swaps the snapshots in. A failed
    /// rebuild leaves the previous snapshots serving.
    fn reload(&self) -> Result<(), PipelineError> {
        let environment = Arc::new(Environment::load(&self.config)?);
        let registry = Arc::new(TemplateRegistry::load(&self.config.templates_path, &environment)?);
        let assembler = Arc::new(PdfAssembler::new(Arc::clone(&environment))?);
        *write_lock(&self.environment) = environment;
        *write_lock(&self.registry) = registry;
        *write_lock(&self.assembler) = assembler;
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            registry: Arc::clone(&read_lock(&self.registry)),
            assembler: Arc::clone(&read_lock(&self.assembler)),
        }
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/is_alive", get(is_alive))
        .route("/is_ready", get(is_ready))
        .route(
            "/api/v1/genpdf/{application}/{template}",
            post(generate_pdf).get(generate_pdf_from_empty_context),
        )
        .route("/api/v1/genhtml/{application}/{template}", post(generate_html))
        .route("/api/v1/genpdf/image/{application}", post(generate_pdf_from_image))
        .fallback(list_known_templates)
        .with_state(state)
}

pub async fn serve(config: Config) -> Result<(), PipelineError> {
    let bind_address = config.bind_address.clone();
    let state = AppState::initialize(config)?;
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on {}", bind_address);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn is_alive() -> &'static str {
    "I'm alive"
}

async fn is_ready() -> &'static str {
    "I'm ready"
}

async fn generate_pdf(
    State(state): State<Arc<AppState>>,
    Path((application, template)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let payload = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                return plain_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e))
            }
        }
    };
    run_pdf_pipeline(state, application, template, payload).await
}

async fn generate_pdf_from_empty_context(
    State(state): State<Arc<AppState>>,
    Path((application, template)): Path<(String, String)>,
) -> Response {
    if state.config.disable_pdf_get {
        return known_templates_response(&state);
    }
    run_pdf_pipeline(state, application, template, json!({})).await
}

async fn run_pdf_pipeline(
    state: Arc<AppState>,
    application: String,
    template: String,
    payload: Value,
) -> Response {
    if let Some(response) = dev_mode_reload(&state) {
        return response;
    }
    let snapshot = state.snapshot();
    let result = tokio::task::spawn_blocking(move || {
        match render_html(&snapshot.registry, &application, &template, &payload)? {
            Some(html) => snapshot.assembler.assemble(&html, &template).map(Some),
            None => Ok(None),
        }
    })
    .await;

    match result {
        Ok(Ok(Some(bytes))) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/pdf")],
            bytes,
        )
            .into_response(),
        Ok(Ok(None)) => plain_response(StatusCode::NOT_FOUND, TEMPLATE_NOT_FOUND.to_string()),
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            error!("Pipeline task panicked: {}", e);
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    }
}

async fn generate_html(
    State(state): State<Arc<AppState>>,
    Path((application, template)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    if !state.config.enable_html_endpoint {
        return known_templates_response(&state);
    }
    if let Some(response) = dev_mode_reload(&state) {
        return response;
    }
    let payload: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                return plain_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e))
            }
        }
    };

    let snapshot = state.snapshot();
    match render_html(&snapshot.registry, &application, &template, &payload) {
        Ok(Some(html)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response(),
        Ok(None) => plain_response(StatusCode::NOT_FOUND, TEMPLATE_NOT_FOUND.to_string()),
        Err(e) => error_response(e),
    }
}

async fn generate_pdf_from_image(
    State(state): State<Arc<AppState>>,
    Path(application): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if content_type != "image/jpeg" && content_type != "image/png" {
        return plain_response(
            StatusCode::BAD_REQUEST,
            format!("Unsupported content type '{}'", content_type),
        );
    }
    if let Some(response) = dev_mode_reload(&state) {
        return response;
    }

    let snapshot = state.snapshot();
    let result =
        tokio::task::spawn_blocking(move || snapshot.assembler.assemble_from_image(&body, &application))
            .await;

    match result {
        Ok(Ok(bytes)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/pdf")],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            error!("Pipeline task panicked: {}", e);
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    }
}

/// Unknown paths answer with every known rendering route, one per line.
async fn list_known_templates(State(state): State<Arc<AppState>>) -> Response {
    known_templates_response(&state)
}

fn known_templates_response(state: &AppState) -> Response {
    let registry = Arc::clone(&read_lock(&state.registry));
    let routes: Vec<String> = registry
        .keys()
        .map(|key| format!("/api/v1/genpdf/{}/{}", key.application, key.template))
        .collect();
    plain_response(StatusCode::NOT_FOUND, routes.join("\n"))
}

fn dev_mode_reload(state: &Arc<AppState>) -> Option<Response> {
    if !state.config.dev_mode {
        return None;
    }
    match state.reload() {
        Ok(()) => None,
        Err(e) => Some(error_response(e)),
    }
}

fn error_response(error: PipelineError) -> Response {
    let status = match &error {
        PipelineError::Malformed(_) | PipelineError::Json(_) | PipelineError::Image(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!("Request failed: {}", error);
    plain_response(status, error.to_string())
}

fn plain_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}
