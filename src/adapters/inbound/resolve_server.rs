//! Resolver Service
//!
//! Standalone HTTP front for the caching geo resolver. Every resolution
//! answers 200 with the metadata as JSON; the outcome is reported in a
//! response header so clients can tell "no data" from "lookup failed".
//!
//! `GET /api/v1/resolve/` with an empty segment resolves the empty address,
//! matching what the in-process resolver does for records without an IP.

use crate::application::{CachingGeoResolver, OUTCOME_HEADER};
use crate::infrastructure::ShutdownController;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cached_entries: usize,
}

/// Resolver service state.
#[derive(Clone)]
pub struct ResolveState {
    pub resolver: Arc<CachingGeoResolver>,
}

/// HTTP server exposing `GET /api/v1/resolve/:ip`.
pub struct ResolveServer {
    listen_addr: String,
    state: ResolveState,
    shutdown: ShutdownController,
}

impl ResolveServer {
    pub fn new(
        listen_addr: String,
        resolver: Arc<CachingGeoResolver>,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            listen_addr,
            state: ResolveState { resolver },
            shutdown,
        }
    }

    /// Build the router with all routes and shared state.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Bind the configured address and serve until shutdown.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!("resolver service listening on {}", listener.local_addr()?);

        let token = self.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;

        tracing::info!("resolver service stopped");
        Ok(())
    }
}

fn build_router(state: ResolveState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/resolve/", get(resolve_empty_handler))
        .route("/api/v1/resolve/:ip", get(resolve_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Handler functions

async fn health_handler(State(state): State<ResolveState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_entries: state.resolver.cache().len(),
    })
}

async fn resolve_handler(
    State(state): State<ResolveState>,
    Path(ip): Path<String>,
) -> impl IntoResponse {
    resolve(&state, &ip).await
}

async fn resolve_empty_handler(State(state): State<ResolveState>) -> impl IntoResponse {
    resolve(&state, "").await
}

async fn resolve(state: &ResolveState, ip: &str) -> Response {
    tracing::info!(ip = %ip, "resolve request received");

    let resolution = state.resolver.resolve_detailed(ip).await;
    let outcome = resolution.label();

    ([(OUTCOME_HEADER, outcome)], Json(resolution.into_metadata())).into_response()
}
