pub mod app;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod session;
pub mod task;
pub mod transport;

pub use config::Settings;
pub use error::{TrackerError, TransportError, ValidationError};
pub use orchestrator::{Command, Orchestrator};
pub use poller::{PollerConfig, PollerUpdate, PollerUpdateKind, StatusPoller};
pub use session::{Event, Session, Step};
pub use task::{Task, TaskStatus, TrackingRequest, UploadedFile};
pub use transport::{HttpTransport, Transport};
