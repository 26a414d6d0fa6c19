//! Auth gate: the single shared token check in front of every file operation.
//!
//! The stored token is fetched from the secret store on every check, so a
//! rotated token applies to the very next request. A successful check yields
//! an [`Access`] value, which every [`FileApi`](crate::files::FileApi)
//! operation requires.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use editor_store::{Result as StoreResult, SecretStore};

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the token on JSON API routes
pub const TOKEN_HEADER: &str = "x-api-token";

/// Default secret name the token is stored under
pub const DEFAULT_TOKEN_NAME: &str = "API_TOKEN";

/// Proof that a request passed the auth gate.
///
/// Only [`AuthGate::require`] constructs this.
#[derive(Debug)]
pub struct Access {
    _private: (),
}

#[cfg(test)]
impl Access {
    pub(crate) fn for_tests() -> Self {
        Self { _private: () }
    }
}

pub struct AuthGate {
    secrets: Arc<dyn SecretStore>,
    token_name: String,
}

impl AuthGate {
    pub fn new(secrets: Arc<dyn SecretStore>, token_name: impl Into<String>) -> Self {
        Self {
            secrets,
            token_name: token_name.into(),
        }
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    /// True iff `supplied` exactly equals the stored token.
    ///
    /// An unset stored token denies everything.
    pub async fn authorize(&self, supplied: &str) -> StoreResult<bool> {
        let stored = self.secrets.get(&self.token_name).await?;
        Ok(matches!(stored, Some(stored) if stored == supplied))
    }

    /// Authorize, mapping denial to [`ApiError::Unauthorized`].
    pub async fn require(&self, supplied: &str) -> Result<Access, ApiError> {
        if self.authorize(supplied).await? {
            Ok(Access { _private: () })
        } else {
            tracing::debug!("Rejected request with invalid token");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Extractor that authorizes the `X-API-Token` header.
///
/// Runs before any body extractor, so an unauthorized request is rejected
/// without looking at its body. A missing or non-UTF-8 header is treated as
/// a wrong token.
pub struct HeaderAccess(pub Access);

impl FromRequestParts<Arc<AppState>> for HeaderAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let supplied = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        state.gate.require(supplied).await.map(HeaderAccess)
    }
}
