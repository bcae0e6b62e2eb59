//! HTTP API for Braid.
//!
//! Provides an [`HttpServer`] exposing the file endpoints over an
//! axum-based API:
//!
//! - `POST   /file` — upload (multipart form field `file`)
//! - `GET    /file?filename=<name>` — download the reconstructed file
//! - `GET    /file/list` — list owned files with shard availability
//! - `DELETE /file?filename=<name>` — delete a file
//!
//! Every route requires `Authorization: Bearer <token>`; the token is
//! resolved to an owner identity by the configured [`TokenResolver`].
//! The boundary is stateless — all business logic lives in the engine.

mod auth;
mod error;
mod handlers;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use braid_engine::FileEngine;
use tracing::warn;

pub use auth::{AuthError, Claims, JwtResolver, TokenResolver, issue_token};
pub use error::ApiError;

/// The core holds whole files in memory, so cap request bodies. 1 GiB.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Shared application state for all handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    /// The storage engine (trait object — works with any [`FileEngine`] impl).
    pub engine: Arc<dyn FileEngine>,
    /// Bearer-token to owner-identity resolver.
    pub resolver: Arc<dyn TokenResolver>,
}

/// Authentication middleware.
///
/// Resolves the `Authorization: Bearer <token>` header to an
/// [`OwnerId`](braid_types::OwnerId) and stores it in the request
/// extensions for the handlers. Requests without a resolvable token are
/// rejected with 401.
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let Some(token) = header.strip_prefix("Bearer ") else {
        warn!("request without bearer token");
        return Err(ApiError::Unauthorized);
    };

    let owner = state.resolver.resolve(token).map_err(|e| {
        warn!(%e, "bearer token rejected");
        ApiError::Unauthorized
    })?;

    request.extensions_mut().insert(owner);
    Ok(next.run(request).await)
}

/// Configuration for creating an [`HttpServer`].
pub struct HttpServerConfig {
    /// The storage engine to serve (any [`FileEngine`] implementation).
    pub engine: Arc<dyn FileEngine>,
    /// The bearer-token resolver.
    pub resolver: Arc<dyn TokenResolver>,
}

/// HTTP server backed by any [`FileEngine`] implementation.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new server with the given configuration.
    pub fn new(config: HttpServerConfig) -> Self {
        let state = AppState {
            engine: config.engine,
            resolver: config.resolver,
        };
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the axum [`Router`] for the file API.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route(
                "/file",
                get(handlers::retrieve_file)
                    .post(handlers::upload_file)
                    .delete(handlers::delete_file),
            )
            .route("/file/list", get(handlers::list_files))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            ))
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .with_state(state)
    }

    /// Return the inner [`Router`] (useful for testing with
    /// `tower::ServiceExt`).
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the API on the given TCP address.
    pub async fn serve(self, addr: &str) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr, "file API listening");
        axum::serve(listener, self.router).await
    }

    /// Serve the API with graceful shutdown triggered by the given future.
    ///
    /// When `shutdown` completes, the server stops accepting new
    /// connections and waits for in-flight requests to finish.
    pub async fn serve_with_shutdown(
        self,
        addr: &str,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr, "file API listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
