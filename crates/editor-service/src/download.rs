//! Direct file download with the token embedded in the path.
//!
//! Mounted at both `/{token}/{key}` and `/api/file-download/{token}/{key}`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::AppState;

/// Handler for `GET /{token}/{key}`
pub async fn handler(
    State(state): State<Arc<AppState>>,
    Path((token, key)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let access = state.gate.require(&token).await?;
    let content = state.files.read(&access, &key).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&key)),
        ],
        content,
    )
        .into_response())
}

/// Build an `attachment` Content-Disposition naming the file after `key`.
///
/// Quotes and backslashes are escaped. Keys outside printable ASCII get an
/// `_`-substituted fallback plus an RFC 5987 `filename*` parameter.
pub fn content_disposition(key: &str) -> String {
    let is_plain = |c: char| c.is_ascii() && !c.is_ascii_control();

    let mut fallback = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '"' | '\\' => {
                fallback.push('\\');
                fallback.push(c);
            }
            c if is_plain(c) => fallback.push(c),
            _ => fallback.push('_'),
        }
    }

    if key.chars().all(is_plain) {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(key)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_key() {
        assert_eq!(
            content_disposition("config.yaml"),
            "attachment; filename=\"config.yaml\""
        );
    }

    #[test]
    fn test_escapes_quotes() {
        assert_eq!(
            content_disposition("a\"b\\c"),
            "attachment; filename=\"a\\\"b\\\\c\""
        );
    }

    #[test]
    fn test_non_ascii_key() {
        assert_eq!(
            content_disposition("résumé.txt"),
            "attachment; filename=\"r_sum_.txt\"; filename*=UTF-8''r%C3%A9sum%C3%A9.txt"
        );
    }
}
