use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DetectionSettings;

/// Lifecycle status reported by the tracking service. Strict forward
/// progression; `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// One tracking job as the service reports it. The submit response and
/// every status probe both deserialize into this shape; the optional
/// fields simply stay empty on submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub status: TaskStatus,
    /// Percent complete (0-100), only meaningful while non-terminal.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Task {
    /// Handle used to build the download location, present once the job
    /// completed.
    pub fn result_ref(&self) -> Option<&str> {
        match self.status {
            TaskStatus::Completed => Some(&self.task_id),
            _ => None,
        }
    }
}

/// A successfully uploaded video, as identified by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_id: String,
    pub file_name: String,
}

/// Body of `POST /api/upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Everything `POST /api/track` needs. Detection parameters come from
/// configuration, never from user-facing state.
#[derive(Debug, Clone)]
pub struct TrackingRequest {
    pub file_id: String,
    pub text_prompt: String,
    pub prompt_type: String,
    pub box_threshold: f64,
    pub text_threshold: f64,
}

impl TrackingRequest {
    pub fn new(file_id: &str, text_prompt: &str, detection: &DetectionSettings) -> Self {
        Self {
            file_id: file_id.to_string(),
            text_prompt: text_prompt.trim().to_string(),
            prompt_type: detection.prompt_type.clone(),
            box_threshold: detection.box_threshold,
            text_threshold: detection.text_threshold,
        }
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub models_loaded: bool,
}
