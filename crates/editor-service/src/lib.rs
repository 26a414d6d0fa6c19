//! editor-service: token-gated file API for bucket-editor
//!
//! Provides:
//! - Token validation for the editor front end
//! - List / read / write / delete / rename over a blob store
//! - Raw file download with the token embedded in the path
//!
//! All file routes share one [`AuthGate`]; only the place the token is
//! taken from differs (header, path segment or JSON body).

pub mod auth;
pub mod config;
pub mod download;
pub mod error;
pub mod files;
pub mod routes;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use editor_store::{BlobStore, SecretStore};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use auth::{Access, AuthGate};
pub use config::Config;
pub use error::ApiError;
pub use files::FileApi;

/// Shared application state
pub struct AppState {
    pub gate: AuthGate,
    pub files: FileApi,
}

impl AppState {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        secrets: Arc<dyn SecretStore>,
        token_name: impl Into<String>,
    ) -> Self {
        Self {
            gate: AuthGate::new(secrets, token_name),
            files: FileApi::new(blobs),
        }
    }
}

/// Build the route table.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/validate-token", post(routes::validate_token))
        .route("/api/files", get(routes::list_files))
        .route("/api/file", put(routes::write_file))
        .route(
            "/api/file/{key}",
            get(routes::read_file).delete(routes::delete_file),
        )
        .route("/api/rename", post(routes::rename_file))
        // Same download handler at both route shapes
        .route(
            "/api/file-download/{token}/{key}",
            get(download::handler),
        )
        .route("/{token}/{key}", get(download::handler))
        .with_state(state)
}

/// Wrap the router with tracing, body limit and optional CORS from `config`.
pub fn app(state: Arc<AppState>, config: &Config) -> Router {
    let body_limit = match config.max_body_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    let mut app = router(state)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&config.cors_allowed_origins) {
        app = app.layer(cors);
    }

    app
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(auth::TOKEN_HEADER),
            ]),
    )
}
