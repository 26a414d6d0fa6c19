//! Typed access to the editor service's HTTP API.

use async_trait::async_trait;
use reqwest::{header, Response};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Header carrying the token on JSON API routes
const TOKEN_HEADER: &str = "X-API-Token";

/// A file fetched through the download route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Filename announced by the server
    pub filename: String,
    pub content: String,
}

/// The file operations a session needs from the server.
#[async_trait]
pub trait EditorApi: Send + Sync {
    async fn validate_token(&self, token: &str) -> Result<bool>;
    async fn list_files(&self, token: &str) -> Result<Vec<String>>;
    async fn read_file(&self, token: &str, key: &str) -> Result<String>;
    async fn write_file(&self, token: &str, key: &str, content: &str) -> Result<()>;
    async fn delete_file(&self, token: &str, key: &str) -> Result<()>;
    async fn rename_file(&self, token: &str, old_key: &str, new_key: &str) -> Result<()>;
    async fn download(&self, token: &str, key: &str) -> Result<Download>;
}

#[derive(Serialize)]
struct ValidateTokenRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct ValidateTokenResponse {
    valid: bool,
}

#[derive(Deserialize)]
struct FileListResponse {
    files: Vec<String>,
}

#[derive(Deserialize)]
struct FileContentResponse {
    content: String,
}

#[derive(Serialize)]
struct WriteFileRequest<'a> {
    file: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest<'a> {
    old_name: &'a str,
    new_name: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`EditorApi`] over HTTP.
pub struct HttpEditorApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEditorApi {
    /// `base_url` is the service root, e.g. `http://localhost:8788`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_error(action: &'static str) -> impl Fn(reqwest::Error) -> ClientError {
        move |e| ClientError::Request {
            action,
            detail: e.to_string(),
        }
    }

    /// Turn any non-success response into [`ClientError::Request`].
    async fn check(response: Response, action: &'static str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string()
            });

        Err(ClientError::Request {
            action,
            detail: format!("{} {}", status.as_u16(), message),
        })
    }
}

#[async_trait]
impl EditorApi for HttpEditorApi {
    async fn validate_token(&self, token: &str) -> Result<bool> {
        const ACTION: &str = "validate token";
        let response = self
            .client
            .post(self.url("/api/validate-token"))
            .json(&ValidateTokenRequest { token })
            .send()
            .await
            .map_err(Self::request_error(ACTION))?;
        let body: ValidateTokenResponse = Self::check(response, ACTION)
            .await?
            .json()
            .await
            .map_err(Self::request_error(ACTION))?;
        Ok(body.valid)
    }

    async fn list_files(&self, token: &str) -> Result<Vec<String>> {
        const ACTION: &str = "fetch files";
        let response = self
            .client
            .get(self.url("/api/files"))
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(Self::request_error(ACTION))?;
        let body: FileListResponse = Self::check(response, ACTION)
            .await?
            .json()
            .await
            .map_err(Self::request_error(ACTION))?;
        Ok(body.files)
    }

    async fn read_file(&self, token: &str, key: &str) -> Result<String> {
        const ACTION: &str = "load file";
        let response = self
            .client
            .get(self.url(&format!("/api/file/{}", urlencoding::encode(key))))
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(Self::request_error(ACTION))?;
        let body: FileContentResponse = Self::check(response, ACTION)
            .await?
            .json()
            .await
            .map_err(Self::request_error(ACTION))?;
        Ok(body.content)
    }

    async fn write_file(&self, token: &str, key: &str, content: &str) -> Result<()> {
        const ACTION: &str = "save file";
        let response = self
            .client
            .put(self.url("/api/file"))
            .header(TOKEN_HEADER, token)
            .json(&WriteFileRequest { file: key, content })
            .send()
            .await
            .map_err(Self::request_error(ACTION))?;
        Self::check(response, ACTION).await?;
        Ok(())
    }

    async fn delete_file(&self, token: &str, key: &str) -> Result<()> {
        const ACTION: &str = "delete file";
        let response = self
            .client
            .delete(self.url(&format!("/api/file/{}", urlencoding::encode(key))))
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(Self::request_error(ACTION))?;
        Self::check(response, ACTION).await?;
        Ok(())
    }

    async fn rename_file(&self, token: &str, old_key: &str, new_key: &str) -> Result<()> {
        const ACTION: &str = "rename file";
        let response = self
            .client
            .post(self.url("/api/rename"))
            .header(TOKEN_HEADER, token)
            .json(&RenameRequest {
                old_name: old_key,
                new_name: new_key,
            })
            .send()
            .await
            .map_err(Self::request_error(ACTION))?;
        Self::check(response, ACTION).await?;
        Ok(())
    }

    async fn download(&self, token: &str, key: &str) -> Result<Download> {
        const ACTION: &str = "download file";
        let url = self.url(&format!(
            "/api/file-download/{}/{}",
            urlencoding::encode(token),
            urlencoding::encode(key)
        ));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Self::request_error(ACTION))?;
        let response = Self::check(response, ACTION).await?;

        let filename = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename)
            .unwrap_or_else(|| key.to_string());

        let content = response
            .text()
            .await
            .map_err(Self::request_error(ACTION))?;

        Ok(Download { filename, content })
    }
}

/// Extract the filename from a Content-Disposition value.
///
/// Prefers the RFC 5987 `filename*=UTF-8''...` parameter over `filename="..."`.
pub fn disposition_filename(value: &str) -> Option<String> {
    if let Some(idx) = value.find("filename*=UTF-8''") {
        let encoded = value[idx + "filename*=UTF-8''".len()..]
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return Some(decoded.into_owned());
        }
    }

    let idx = value.find("filename=\"")?;
    let mut name = String::new();
    let mut chars = value[idx + "filename=\"".len()..].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => name.push(chars.next()?),
            '"' => return Some(name),
            c => name.push(c),
        }
    }
    None
}
