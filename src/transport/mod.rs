pub mod http;

pub use http::HttpTransport;

use std::path::Path;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::task::{ServiceHealth, Task, TrackingRequest, UploadedFile};

/// Outbound surface of the tracking service. One request/response pair
/// per call, no retry policy of its own; retries belong to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Multipart-upload a local video file.
    async fn upload(&self, path: &Path) -> Result<UploadedFile, TransportError>;

    /// Submit a tracking job. Rejects an empty `file_id` or
    /// `text_prompt` before any network round-trip.
    async fn submit(&self, request: &TrackingRequest) -> Result<Task, TransportError>;

    /// One status probe. A failure here says nothing about the job;
    /// callers treat it as transient.
    async fn fetch_status(&self, task_id: &str) -> Result<Task, TransportError>;

    /// Stream the finished result video to `dest`, returning the byte
    /// count written.
    async fn download(&self, task_id: &str, dest: &Path) -> Result<u64, TransportError>;

    /// Service readiness probe.
    async fn health(&self) -> Result<ServiceHealth, TransportError>;

    /// Best-effort removal of the service's temporary files for a task.
    async fn cleanup(&self, task_id: &str) -> Result<(), TransportError>;

    /// Where the result video for `task_id` can be fetched from.
    fn download_url(&self, task_id: &str) -> String;
}
