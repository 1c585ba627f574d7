//! HTTP surface
//!
//! Two routers, one per trust domain. The user API sits behind the
//! configured human scheme, the agent API behind source-issued tokens. Share
//! token reads and health checks are public.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, put};
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{AgentPrincipal, Authenticator, HumanPrincipal};
use crate::authz::Result;
use crate::model::{InventoryUpdate, ShareToken, Source};
use crate::service::{CreatedSource, SourceService, SourceUpdate};
use crate::{Error, Result as CrateResult};

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct CreateSourceRequest {
    name: String,
}

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub sources: SourceService,
}

impl AppState {
    pub const fn new(sources: SourceService) -> Self {
        Self { sources }
    }
}

/// Router for the user API
pub fn user_router(state: AppState, authenticator: Authenticator, timeout: Duration) -> Router {
    let protected = Router::new()
        .route("/api/v1/sources", get(list_sources).post(create_source))
        .route(
            "/api/v1/sources/{id}",
            get(get_source).put(update_source).delete(delete_source),
        )
        .route(
            "/api/v1/sources/{id}/share",
            get(get_share_token)
                .post(share_source)
                .delete(unshare_source),
        )
        .route("/api/v1/share-tokens", get(list_share_tokens));

    #[allow(unused_mut)]
    let mut public = Router::new()
        .route("/api/v1/shared/{token}", get(get_shared_source))
        .route("/health", get(health_handler));

    #[cfg(feature = "metrics")]
    {
        public = public.route("/metrics", get(metrics_handler));
    }

    finish(public.merge(authenticator.protect(protected)), state, timeout)
}

/// Router for the agent API
pub fn agent_router(state: AppState, authenticator: Authenticator, timeout: Duration) -> Router {
    let protected = Router::new().route(
        "/api/v1/agent/sources/{id}/inventory",
        put(update_inventory),
    );
    let public = Router::new().route("/health", get(health_handler));

    finish(public.merge(authenticator.protect(protected)), state, timeout)
}

fn finish(router: Router<AppState>, state: AppState, timeout: Duration) -> Router {
    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
}

/// Bind `addr` and serve `router` until `shutdown` resolves.
pub async fn serve(
    name: &'static str,
    router: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> CrateResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!(api = name, "HTTP server listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!(api = name, "HTTP server shutdown complete");
    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(feature = "metrics")]
async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}

async fn create_source(
    State(state): State<AppState>,
    user: HumanPrincipal,
    Json(body): Json<CreateSourceRequest>,
) -> Result<(StatusCode, Json<CreatedSource>)> {
    let created = state.sources.create_source(&user, &body.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_sources(
    State(state): State<AppState>,
    user: HumanPrincipal,
) -> Result<Json<Vec<Source>>> {
    Ok(Json(state.sources.list_sources(&user).await?))
}

async fn get_source(
    State(state): State<AppState>,
    user: HumanPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<Source>> {
    Ok(Json(state.sources.get_source(&user, id).await?))
}

async fn update_source(
    State(state): State<AppState>,
    user: HumanPrincipal,
    Path(id): Path<Uuid>,
    Json(update): Json<SourceUpdate>,
) -> Result<Json<Source>> {
    Ok(Json(state.sources.update_source(&user, id, update).await?))
}

async fn delete_source(
    State(state): State<AppState>,
    user: HumanPrincipal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sources.delete_source(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_share_token(
    State(state): State<AppState>,
    user: HumanPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareToken>> {
    let token = state.sources.get_share_token(&user, id).await?;
    crate::authz::found(token, "share token").map(Json)
}

async fn share_source(
    State(state): State<AppState>,
    user: HumanPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareToken>> {
    Ok(Json(state.sources.share_source(&user, id).await?))
}

async fn unshare_source(
    State(state): State<AppState>,
    user: HumanPrincipal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sources.unshare_source(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_share_tokens(
    State(state): State<AppState>,
    user: HumanPrincipal,
) -> Result<Json<Vec<ShareToken>>> {
    Ok(Json(state.sources.list_share_tokens(&user).await?))
}

async fn get_shared_source(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Source>> {
    Ok(Json(state.sources.get_shared_source(&token).await?))
}

async fn update_inventory(
    State(state): State<AppState>,
    agent: AgentPrincipal,
    Path(id): Path<Uuid>,
    Json(update): Json<InventoryUpdate>,
) -> Result<Json<Source>> {
    Ok(Json(state.sources.update_inventory(&agent, id, update).await?))
}
