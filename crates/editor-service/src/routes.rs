//! JSON API handlers under `/api`.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::HeaderAccess;
use crate::error::ApiError;
use crate::AppState;

/// JSON body extractor whose rejections become [`ApiError::BadInput`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FileContentResponse {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteFileRequest {
    pub file: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Handler for `POST /api/validate-token`
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<ValidateTokenRequest>,
) -> Result<Json<ValidateTokenResponse>, ApiError> {
    let valid = state.gate.authorize(&request.token).await?;
    tracing::debug!("Token validation: valid={}", valid);
    Ok(Json(ValidateTokenResponse { valid }))
}

/// Handler for `GET /api/files`
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    HeaderAccess(access): HeaderAccess,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state.files.list(&access).await?;
    Ok(Json(FileListResponse { files }))
}

/// Handler for `GET /api/file/{key}`
pub async fn read_file(
    State(state): State<Arc<AppState>>,
    HeaderAccess(access): HeaderAccess,
    Path(key): Path<String>,
) -> Result<Json<FileContentResponse>, ApiError> {
    let content = state.files.read(&access, &key).await?;
    Ok(Json(FileContentResponse { content }))
}

/// Handler for `PUT /api/file`
pub async fn write_file(
    State(state): State<Arc<AppState>>,
    HeaderAccess(access): HeaderAccess,
    JsonBody(request): JsonBody<WriteFileRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .files
        .write(&access, &request.file, &request.content)
        .await?;
    Ok(SuccessResponse::ok())
}

/// Handler for `DELETE /api/file/{key}`
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    HeaderAccess(access): HeaderAccess,
    Path(key): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.files.delete(&access, &key).await?;
    Ok(SuccessResponse::ok())
}

/// Handler for `POST /api/rename`
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    HeaderAccess(access): HeaderAccess,
    JsonBody(request): JsonBody<RenameRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .files
        .rename(&access, &request.old_name, &request.new_name)
        .await?;
    Ok(SuccessResponse::ok())
}
