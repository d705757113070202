//! Client for the companion file bed service.
//!
//! ```text
//! POST <upload_url>  {"file_name", "file_data": <data URI>, "api_key"}
//!   ← {"success": true, "filename": "..."} | {"error": "..."}
//! public URL = <upload_url minus last segment>/uploads/<filename>
//! ```

use std::time::Duration;

use arena_bridge_types::BridgeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::AttachmentUploader;
use crate::error::AppResult;

const UPLOAD_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    file_name: &'a str,
    file_data: &'a str,
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Build the shared HTTP client used for uploads.
pub fn build_http_client() -> AppResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
        .tcp_nodelay(true)
        .build()?)
}

/// File bed uploader bound to one upload endpoint.
#[derive(Debug, Clone)]
pub struct FileBedClient {
    client: reqwest::Client,
    upload_url: String,
    api_key: Option<String>,
}

impl FileBedClient {
    pub fn new(client: reqwest::Client, upload_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self { client, upload_url: upload_url.into(), api_key: api_key.filter(|k| !k.is_empty()) }
    }

    /// Public URL of an uploaded file.
    pub fn public_url(&self, filename: &str) -> String {
        let prefix = self.upload_url.rsplit_once('/').map_or(self.upload_url.as_str(), |(head, _)| head);
        format!("{prefix}/uploads/{filename}")
    }
}

#[async_trait]
impl AttachmentUploader for FileBedClient {
    async fn upload(&self, file_name: &str, data_uri: &str) -> Result<String, BridgeError> {
        let body = UploadRequest { file_name, file_data: data_uri, api_key: self.api_key.as_deref() };

        let response = self
            .client
            .post(&self.upload_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::AttachmentUpload { message: format!("Connection error: {e}") })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("File bed rejected '{}': HTTP {}", file_name, status);
            return Err(BridgeError::AttachmentUpload { message: format!("HTTP error: {} - {}", status.as_u16(), text) });
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::AttachmentUpload { message: format!("Invalid file bed response: {e}") })?;

        match parsed {
            UploadResponse { success: true, filename: Some(filename), .. } if !filename.is_empty() => {
                let url = self.public_url(&filename);
                tracing::info!("Uploaded '{}' to file bed as {}", file_name, url);
                Ok(url)
            },
            UploadResponse { error, .. } => {
                let message = error.unwrap_or_else(|| "File bed returned an unknown error.".to_string());
                tracing::error!("File bed upload of '{}' failed: {}", file_name, message);
                Err(BridgeError::AttachmentUpload { message })
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> FileBedClient {
        FileBedClient::new(
            build_http_client().unwrap(),
            format!("{}/upload", server.uri()),
            api_key.map(str::to_string),
        )
    }

    #[test]
    fn test_public_url() {
        let client = FileBedClient::new(reqwest::Client::new(), "http://127.0.0.1:5180/upload", None);
        assert_eq!(client.public_url("abc.png"), "http://127.0.0.1:5180/uploads/abc.png");
    }

    #[tokio::test]
    async fn test_successful_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(body_partial_json(serde_json::json!({
                "file_name": "cat.png",
                "file_data": "data:image/png;base64,AAAA",
                "api_key": "secret"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": true, "filename": "1700-cat.png"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = client_for(&server, Some("secret"))
            .upload("cat.png", "data:image/png;base64,AAAA")
            .await
            .unwrap();
        assert_eq!(url, format!("{}/uploads/1700-cat.png", server.uri()));
    }

    #[tokio::test]
    async fn test_error_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "bad key"})))
            .mount(&server)
            .await;

        let err = client_for(&server, None).upload("x.png", "data:image/png;base64,AA").await.unwrap_err();
        assert_eq!(err, BridgeError::AttachmentUpload { message: "bad key".to_string() });
    }

    #[tokio::test]
    async fn test_http_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client_for(&server, None).upload("x.png", "data:image/png;base64,AA").await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert_eq!(err.error_code(), "attachment_error");
    }
}
