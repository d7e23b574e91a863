use crate::task::{Task, TaskStatus, UploadedFile};

/// Shown when a failed task carries no error body of its own.
pub const PROCESSING_FAILED_FALLBACK: &str = "Processing failed";
/// Shown when the poll ceiling expires before a terminal status.
pub const PROCESSING_TIMED_OUT: &str =
    "Processing timed out before the service finished; try again";
/// Shown when submission is attempted without a file or a prompt.
pub const MISSING_INPUT: &str = "Please upload a video and enter a detection prompt";

/// The four user-visible screens, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Upload,
    Prompt,
    Processing,
    Result,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Upload, Step::Prompt, Step::Processing, Step::Result];

    pub fn index(&self) -> usize {
        match self {
            Step::Upload => 0,
            Step::Prompt => 1,
            Step::Processing => 2,
            Step::Result => 3,
        }
    }
}

/// Everything the orchestrator tracks about one sitting. The view only
/// ever sees clones of this; all mutation goes through [`Session::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub step: Step,
    pub uploaded_file: Option<UploadedFile>,
    pub text_prompt: String,
    pub task: Option<Task>,
    pub error_message: Option<String>,
    pub is_processing: bool,
    default_prompt: String,
}

/// One observed outcome, fed through [`Session::apply`]. The driver
/// performs the network calls; these record what came back.
#[derive(Debug, Clone)]
pub enum Event {
    UploadSucceeded { file: UploadedFile },
    UploadFailed { message: String },
    SubmitStarted,
    SubmitSucceeded { prompt: String, task: Task },
    SubmitFailed { message: String },
    TaskUpdated { task: Task },
    PollTimedOut,
    Reset,
}

impl Session {
    pub fn new(default_prompt: impl Into<String>) -> Self {
        let default_prompt = default_prompt.into();
        Self {
            step: Step::Upload,
            uploaded_file: None,
            text_prompt: default_prompt.clone(),
            task: None,
            error_message: None,
            is_processing: false,
            default_prompt,
        }
    }

    /// Pure transition function. Events that do not belong to the
    /// current step (a late delivery from a superseded probe, for
    /// example) leave the session untouched.
    pub fn apply(self, event: Event) -> Session {
        match event {
            Event::UploadSucceeded { file } => match self.step {
                Step::Upload => Session {
                    step: Step::Prompt,
                    uploaded_file: Some(file),
                    error_message: None,
                    ..self
                },
                _ => self,
            },
            Event::UploadFailed { message } => match self.step {
                Step::Upload => Session {
                    error_message: Some(message),
                    ..self
                },
                _ => self,
            },
            Event::SubmitStarted => match self.step {
                Step::Prompt => Session {
                    is_processing: true,
                    error_message: None,
                    ..self
                },
                _ => self,
            },
            Event::SubmitSucceeded { prompt, task } => match self.step {
                Step::Prompt => Session {
                    step: Step::Processing,
                    text_prompt: prompt,
                    task: Some(task),
                    ..self
                },
                _ => self,
            },
            Event::SubmitFailed { message } => match self.step {
                Step::Prompt => Session {
                    error_message: Some(message),
                    is_processing: false,
                    ..self
                },
                _ => self,
            },
            Event::TaskUpdated { task } => self.merge_task(task),
            Event::PollTimedOut => match self.step {
                Step::Processing => Session {
                    step: Step::Prompt,
                    error_message: Some(PROCESSING_TIMED_OUT.to_string()),
                    is_processing: false,
                    ..self
                },
                _ => self,
            },
            Event::Reset => Session::new(self.default_prompt),
        }
    }

    fn merge_task(self, incoming: Task) -> Session {
        if self.step != Step::Processing {
            return self;
        }
        let Some(current) = self.task.as_ref() else {
            return self;
        };
        if current.task_id != incoming.task_id {
            return self;
        }

        // The service reports progress monotonically; clamp here so the
        // session upholds that even against a regressing probe.
        let progress = match (current.progress, incoming.progress) {
            (Some(old), Some(new)) => Some(old.max(new)),
            (old, None) => old,
            (None, new) => new,
        };
        let task = Task {
            progress,
            ..incoming
        };

        match task.status {
            TaskStatus::Completed => Session {
                step: Step::Result,
                task: Some(task),
                is_processing: false,
                ..self
            },
            TaskStatus::Failed => {
                let message = task
                    .error
                    .clone()
                    .unwrap_or_else(|| PROCESSING_FAILED_FALLBACK.to_string());
                Session {
                    step: Step::Prompt,
                    task: Some(task),
                    error_message: Some(message),
                    is_processing: false,
                    ..self
                }
            }
            TaskStatus::Pending | TaskStatus::Processing => Session {
                task: Some(task),
                ..self
            },
        }
    }
}
