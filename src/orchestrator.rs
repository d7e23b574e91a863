use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::poller::{PollerConfig, PollerUpdate, PollerUpdateKind, StatusPoller};
use crate::session::{Event, Session, MISSING_INPUT};
use crate::task::TrackingRequest;
use crate::transport::Transport;

/// User intents, sent by the view. The orchestrator is the only writer
/// of the session; the view only ever submits these and renders the
/// snapshots that come back.
#[derive(Debug, Clone)]
pub enum Command {
    Upload { path: PathBuf },
    Submit { prompt: String },
    Download { dest: PathBuf },
    Reset,
}

/// Drives the upload → prompt → processing → result sequence. One task,
/// one select loop: commands from the view on one channel, poller
/// deliveries on the other, session snapshots published after every
/// mutation. All session changes go through [`Session::apply`]; this
/// type only performs the side effects around them.
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    settings: Settings,
    session: Session,
    poller: Option<StatusPoller>,
    command_rx: mpsc::Receiver<Command>,
    session_tx: mpsc::Sender<Session>,
    update_tx: mpsc::Sender<PollerUpdate>,
    update_rx: mpsc::Receiver<PollerUpdate>,
}

impl Orchestrator {
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: Settings,
        command_rx: mpsc::Receiver<Command>,
        session_tx: mpsc::Sender<Session>,
    ) -> Self {
        let (update_tx, update_rx) = mpsc::channel(64);
        let session = Session::new(settings.ui.default_prompt.clone());
        Self {
            transport,
            settings,
            session,
            poller: None,
            command_rx,
            session_tx,
            update_tx,
            update_rx,
        }
    }

    pub async fn run(mut self) {
        self.probe_service_health();
        self.publish();
        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        info!("Command channel closed, orchestrator stopping");
                        break;
                    }
                },
                Some(update) = self.update_rx.recv() => self.handle_poller_update(update),
            }
            self.publish();
        }
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Upload { path } => self.handle_upload(path).await,
            Command::Submit { prompt } => self.handle_submit(prompt).await,
            Command::Download { dest } => self.handle_download(dest),
            Command::Reset => self.handle_reset(),
        }
    }

    async fn handle_upload(&mut self, path: PathBuf) {
        info!("Uploading {}", path.display());
        match self.transport.upload(&path).await {
            Ok(file) => {
                info!("Upload accepted as file {}", file.file_id);
                self.apply(Event::UploadSucceeded { file });
            }
            Err(e) => {
                error!("Upload failed: {}", e);
                self.apply(Event::UploadFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    async fn handle_submit(&mut self, prompt: String) {
        // The prompt screen cannot exist without an uploaded file, so
        // this only trips on a stray programmatic command.
        let Some(file) = self.session.uploaded_file.clone() else {
            warn!("Submit requested without an uploaded file, ignoring");
            return;
        };
        if prompt.trim().is_empty() {
            self.apply(Event::SubmitFailed {
                message: MISSING_INPUT.to_string(),
            });
            return;
        }

        self.apply(Event::SubmitStarted);
        self.publish();

        let request = TrackingRequest::new(&file.file_id, &prompt, &self.settings.detection);
        match self.transport.submit(&request).await {
            Ok(task) => {
                info!(
                    "Tracking task {} accepted with status {}",
                    task.task_id, task.status
                );
                self.start_poller(task.task_id.clone());
                self.apply(Event::SubmitSucceeded { prompt, task });
            }
            Err(e) => {
                error!("Failed to start tracking: {}", e);
                self.apply(Event::SubmitFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    fn start_poller(&mut self, task_id: String) {
        // One loop per task: a new submission supersedes any prior loop
        // before its poller exists.
        if let Some(prior) = self.poller.take() {
            prior.cancel();
        }
        self.poller = Some(StatusPoller::spawn(
            self.transport.clone(),
            task_id,
            PollerConfig::from(&self.settings.poller),
            self.update_tx.clone(),
        ));
    }

    fn handle_poller_update(&mut self, update: PollerUpdate) {
        let Some(active) = self.poller.as_ref() else {
            debug!(
                "Dropping update for task {} delivered after poller shutdown",
                update.task_id
            );
            return;
        };
        if active.id() != update.poller_id {
            debug!(
                "Dropping update from superseded poller {} for task {}",
                update.poller_id, update.task_id
            );
            return;
        }

        match update.kind {
            PollerUpdateKind::Status(task) => {
                debug!(
                    "Task {} is {} (progress {:?}) at {}",
                    task.task_id, task.status, task.progress, update.received_at
                );
                let terminal = task.status.is_terminal();
                self.apply(Event::TaskUpdated { task });
                if terminal {
                    if let Some(poller) = self.poller.take() {
                        poller.cancel();
                    }
                }
            }
            PollerUpdateKind::TimedOut => {
                warn!(
                    "Task {} did not finish before the poll ceiling",
                    update.task_id
                );
                self.apply(Event::PollTimedOut);
                if let Some(poller) = self.poller.take() {
                    poller.cancel();
                }
            }
        }
    }

    fn handle_reset(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
        if let Some(task) = self.session.task.as_ref() {
            if task.status.is_terminal() {
                let transport = self.transport.clone();
                let task_id = task.task_id.clone();
                tokio::spawn(async move {
                    if let Err(e) = transport.cleanup(&task_id).await {
                        debug!("Cleanup for task {} failed: {}", task_id, e);
                    }
                });
            }
        }
        info!("Session reset");
        self.apply(Event::Reset);
    }

    // Saving the result is display-only; it never touches the session,
    // so a failure here leaves the Result step fully interactive.
    fn handle_download(&mut self, dest: PathBuf) {
        let Some(task_id) = self
            .session
            .task
            .as_ref()
            .and_then(|task| task.result_ref())
            .map(str::to_owned)
        else {
            warn!("Download requested without a completed task");
            return;
        };
        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.download(&task_id, &dest).await {
                Ok(written) => info!(
                    "Saved result video for task {} to {} ({} bytes)",
                    task_id,
                    dest.display(),
                    written
                ),
                Err(e) => error!("Failed to save result video for task {}: {}", task_id, e),
            }
        });
    }

    fn probe_service_health(&self) {
        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.health().await {
                Ok(health) if health.models_loaded => {
                    info!("Tracking service ready ({})", health.status)
                }
                Ok(health) => warn!(
                    "Tracking service reachable but models not loaded ({})",
                    health.status
                ),
                Err(e) => warn!("Tracking service health probe failed: {}", e),
            }
        });
    }

    fn apply(&mut self, event: Event) {
        self.session = self.session.clone().apply(event);
    }

    fn publish(&self) {
        match self.session_tx.try_send(self.session.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Session snapshot channel full, dropping snapshot")
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Session snapshot receiver dropped")
            }
        }
    }
}
