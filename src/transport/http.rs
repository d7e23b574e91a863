use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::ServiceSettings;
use crate::error::{TransportError, ValidationError};
use crate::task::{ServiceHealth, Task, TrackingRequest, UploadResponse, UploadedFile};
use crate::transport::Transport;

/// Reqwest-backed transport for the tracking service. One client, one
/// base URL; the request timeout comes from configuration and is the
/// only per-probe timeout in the system.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(settings: &ServiceSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(&self, path: &Path) -> Result<UploadedFile, TransportError> {
        const OP: &str = "upload";
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| TransportError::Read {
                operation: OP,
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.mp4".to_string());
        debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.clone()));
        let response = self
            .client
            .post(self.endpoint("/api/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|source| TransportError::Network {
                operation: OP,
                source,
            })?;
        let response = check_status(OP, response).await?;

        let body: UploadResponse =
            response
                .json()
                .await
                .map_err(|source| TransportError::Decode {
                    operation: OP,
                    detail: source.to_string(),
                })?;
        let file_id = body.file_id.ok_or(TransportError::Decode {
            operation: OP,
            detail: "response missing file_id".to_string(),
        })?;
        Ok(UploadedFile {
            file_id,
            file_name: body.filename.unwrap_or(file_name),
        })
    }

    async fn submit(&self, request: &TrackingRequest) -> Result<Task, TransportError> {
        const OP: &str = "submit";
        if request.file_id.trim().is_empty() {
            return Err(TransportError::Invalid {
                operation: OP,
                source: ValidationError::MissingFile,
            });
        }
        if request.text_prompt.trim().is_empty() {
            return Err(TransportError::Invalid {
                operation: OP,
                source: ValidationError::EmptyPrompt,
            });
        }

        let form = Form::new()
            .text("file_id", request.file_id.clone())
            .text("text_prompt", request.text_prompt.clone())
            .text("prompt_type", request.prompt_type.clone())
            .text("box_threshold", request.box_threshold.to_string())
            .text("text_threshold", request.text_threshold.to_string());
        let response = self
            .client
            .post(self.endpoint("/api/track"))
            .multipart(form)
            .send()
            .await
            .map_err(|source| TransportError::Network {
                operation: OP,
                source,
            })?;
        let response = check_status(OP, response).await?;

        response
            .json()
            .await
            .map_err(|source| TransportError::Decode {
                operation: OP,
                detail: source.to_string(),
            })
    }

    async fn fetch_status(&self, task_id: &str) -> Result<Task, TransportError> {
        const OP: &str = "status";
        let response = self
            .client
            .get(self.endpoint(&format!("/api/status/{task_id}")))
            .send()
            .await
            .map_err(|source| TransportError::Network {
                operation: OP,
                source,
            })?;
        let response = check_status(OP, response).await?;

        response
            .json()
            .await
            .map_err(|source| TransportError::Decode {
                operation: OP,
                detail: source.to_string(),
            })
    }

    async fn download(&self, task_id: &str, dest: &Path) -> Result<u64, TransportError> {
        const OP: &str = "download";
        let response = self
            .client
            .get(self.download_url(task_id))
            .send()
            .await
            .map_err(|source| TransportError::Network {
                operation: OP,
                source,
            })?;
        let response = check_status(OP, response).await?;

        let mut file =
            tokio::fs::File::create(dest)
                .await
                .map_err(|source| TransportError::File {
                    operation: OP,
                    path: dest.to_path_buf(),
                    source,
                })?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| TransportError::Network {
                operation: OP,
                source,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|source| TransportError::File {
                    operation: OP,
                    path: dest.to_path_buf(),
                    source,
                })?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|source| TransportError::File {
                operation: OP,
                path: dest.to_path_buf(),
                source,
            })?;
        debug!("Saved task {} result to {} ({} bytes)", task_id, dest.display(), written);
        Ok(written)
    }

    async fn health(&self) -> Result<ServiceHealth, TransportError> {
        const OP: &str = "health";
        let response = self
            .client
            .get(self.endpoint("/api/health"))
            .send()
            .await
            .map_err(|source| TransportError::Network {
                operation: OP,
                source,
            })?;
        let response = check_status(OP, response).await?;

        response
            .json()
            .await
            .map_err(|source| TransportError::Decode {
                operation: OP,
                detail: source.to_string(),
            })
    }

    async fn cleanup(&self, task_id: &str) -> Result<(), TransportError> {
        const OP: &str = "cleanup";
        let response = self
            .client
            .delete(self.endpoint(&format!("/api/cleanup/{task_id}")))
            .send()
            .await
            .map_err(|source| TransportError::Network {
                operation: OP,
                source,
            })?;
        check_status(OP, response).await?;
        Ok(())
    }

    fn download_url(&self, task_id: &str) -> String {
        self.endpoint(&format!("/api/download/{task_id}"))
    }
}

async fn check_status(
    operation: &'static str,
    response: Response,
) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.text().await {
        Ok(body) => extract_detail(&body),
        Err(_) => String::new(),
    };
    let message = if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        message
    };
    Err(TransportError::Http {
        operation,
        status: status.as_u16(),
        message,
    })
}

// The service wraps error text as {"detail": "..."}; fall back to the
// raw body for anything else.
fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(|detail| detail.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}
