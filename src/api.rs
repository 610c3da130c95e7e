use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::oneshot;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::constants::SHUTDOWN_GRACE_SECS;
use crate::error::{Error, ErrorKind};
use crate::issuer::Issuer;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub issuer: Issuer,
}

impl AppState {
    pub fn new(issuer: Issuer) -> Self {
        Self { issuer }
    }
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    fn identifier(self) -> Option<String> {
        self.id.filter(|id| !id.is_empty())
    }
}

/// Issuance failure rendered as plain text with a status from its kind
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Configuration => StatusCode::BAD_REQUEST,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{}", self.0);
        } else {
            warn!("{}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn issue_handler(
    State(state): State<SharedState>,
    Query(query): Query<IdQuery>,
) -> Response {
    let Some(identifier) = query.identifier() else {
        return (StatusCode::BAD_REQUEST, "Missing identifier in query").into_response();
    };

    match state.issuer.issue(&identifier).await {
        Ok(creds) => Json(creds).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn list_handler(
    State(state): State<SharedState>,
    Query(query): Query<IdQuery>,
) -> Result<Response, ApiError> {
    let registry = state.issuer.registry();
    match query.identifier() {
        None => Ok(Json(registry.list_identifiers()).into_response()),
        Some(identifier) => Ok(Json(registry.resolve_metadata(&identifier)?).into_response()),
    }
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/issue", get(issue_handler))
        .route("/v1/list", get(list_handler))
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

pub async fn serve(state: SharedState, port: u16) -> Result<()> {
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    let grace = async {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_SECS)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = &mut server => result?,
        _ = grace => warn!("Graceful shutdown timed out, dropping open connections"),
    }

    info!("HTTP server stopped");
    Ok(())
}

#[cfg(unix)]
async fn unix_signal(kind: tokio::signal::unix::SignalKind, name: &str) {
    match tokio::signal::unix::signal(kind) {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(e) => {
            error!("Failed to listen for {}: {}", name, e);
            std::future::pending::<()>().await;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::SignalKind;
        tokio::select! {
            _ = unix_signal(SignalKind::terminate(), "SIGTERM") => {},
            _ = unix_signal(SignalKind::hangup(), "SIGHUP") => {},
            _ = unix_signal(SignalKind::quit(), "SIGQUIT") => {},
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
