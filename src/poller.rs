use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PollerSettings;
use crate::task::Task;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Pause between the end of one probe and the start of the next.
    pub interval: Duration,
    /// Overall elapsed-time budget for the whole loop.
    pub ceiling: Duration,
}

impl From<&PollerSettings> for PollerConfig {
    fn from(settings: &PollerSettings) -> Self {
        Self {
            interval: settings.interval(),
            ceiling: settings.ceiling(),
        }
    }
}

/// What one poller delivery means.
#[derive(Debug, Clone)]
pub enum PollerUpdateKind {
    /// A successful probe; the freshest Task the service reported.
    Status(Task),
    /// The ceiling elapsed before a terminal status. The loop has
    /// stopped; no further deliveries follow.
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct PollerUpdate {
    pub poller_id: Uuid,
    pub task_id: String,
    pub received_at: DateTime<Utc>,
    pub kind: PollerUpdateKind,
}

/// Handle to one polling loop, scoped to a single task. Owns the
/// spawned loop; dropping the handle tears the loop down. `cancel` is
/// immediate and idempotent, and a cancelled loop never delivers
/// another update, including the result of a probe already in flight.
pub struct StatusPoller {
    id: Uuid,
    task_id: String,
    cancel_token: CancellationToken,
    poll_task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn spawn(
        transport: Arc<dyn Transport>,
        task_id: String,
        config: PollerConfig,
        update_tx: mpsc::Sender<PollerUpdate>,
    ) -> Self {
        let id = Uuid::new_v4();
        let cancel_token = CancellationToken::new();
        let loop_token = cancel_token.clone();
        let loop_task_id = task_id.clone();
        let poll_task = tokio::spawn(async move {
            poll_loop(id, transport, loop_task_id, config, update_tx, loop_token).await;
        });
        info!("Status poller {} started for task {}", id, task_id);
        Self {
            id,
            task_id,
            cancel_token,
            poll_task: Some(poll_task),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn cancel(&self) {
        if !self.cancel_token.is_cancelled() {
            debug!(
                "Cancelling status poller {} for task {}",
                self.id, self.task_id
            );
            self.cancel_token.cancel();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.cancel();
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

async fn poll_loop(
    id: Uuid,
    transport: Arc<dyn Transport>,
    task_id: String,
    config: PollerConfig,
    update_tx: mpsc::Sender<PollerUpdate>,
    cancel_token: CancellationToken,
) {
    let started = Instant::now();
    loop {
        // The submit response already seeded the task, so the first
        // probe waits a full interval like every later one.
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                debug!("Status poller {} for task {} cancelled", id, task_id);
                return;
            }
            _ = tokio::time::sleep(config.interval) => {}
        }

        if started.elapsed() >= config.ceiling {
            warn!(
                "Task {} still not terminal after {:?}, poller {} giving up",
                task_id, config.ceiling, id
            );
            let _ = update_tx
                .send(PollerUpdate {
                    poller_id: id,
                    task_id: task_id.clone(),
                    received_at: Utc::now(),
                    kind: PollerUpdateKind::TimedOut,
                })
                .await;
            return;
        }

        let probe = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                debug!(
                    "Status poller {} for task {} cancelled mid-probe",
                    id, task_id
                );
                return;
            }
            result = transport.fetch_status(&task_id) => result,
        };

        match probe {
            Ok(task) => {
                let terminal = task.status.is_terminal();
                let update = PollerUpdate {
                    poller_id: id,
                    task_id: task_id.clone(),
                    received_at: Utc::now(),
                    kind: PollerUpdateKind::Status(task),
                };
                let delivered = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => return,
                    sent = update_tx.send(update) => sent.is_ok(),
                };
                if !delivered {
                    debug!(
                        "Update receiver for task {} dropped, poller {} stopping",
                        task_id, id
                    );
                    return;
                }
                if terminal {
                    info!(
                        "Task {} reached a terminal status, poller {} stopping",
                        task_id, id
                    );
                    return;
                }
            }
            // Transient by definition; the job itself only fails via a
            // successful probe reporting status == failed.
            Err(e) => {
                warn!(
                    "Status probe for task {} failed, retrying next tick: {}",
                    task_id, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::task::{ServiceHealth, TaskStatus, TrackingRequest, UploadedFile};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{oneshot, Mutex};

    fn task(id: &str, status: TaskStatus, progress: Option<f64>) -> Task {
        Task {
            task_id: id.to_string(),
            status,
            progress,
            message: None,
            error: None,
        }
    }

    fn probe_error() -> TransportError {
        TransportError::Http {
            operation: "status",
            status: 502,
            message: "Bad Gateway".to_string(),
        }
    }

    // Scripted transport: pops one canned probe result per call, or
    // waits on a gate the test resolves by hand. Every other operation
    // is out of scope for the poller.
    struct ScriptedTransport {
        probes: Mutex<VecDeque<Result<Task, TransportError>>>,
        gate: Mutex<Option<oneshot::Receiver<Task>>>,
        probe_delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(probes: Vec<Result<Task, TransportError>>) -> Self {
            Self {
                probes: Mutex::new(probes.into_iter().collect()),
                gate: Mutex::new(None),
                probe_delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn gated(gate: oneshot::Receiver<Task>) -> Self {
            Self {
                probes: Mutex::new(VecDeque::new()),
                gate: Mutex::new(Some(gate)),
                probe_delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn slow(probes: Vec<Result<Task, TransportError>>, delay: Duration) -> Self {
            Self {
                probes: Mutex::new(probes.into_iter().collect()),
                gate: Mutex::new(None),
                probe_delay: Some(delay),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn upload(&self, _path: &Path) -> Result<UploadedFile, TransportError> {
            unimplemented!("poller never uploads")
        }

        async fn submit(&self, _request: &TrackingRequest) -> Result<Task, TransportError> {
            unimplemented!("poller never submits")
        }

        async fn fetch_status(&self, task_id: &str) -> Result<Task, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = self.gate.lock().await.take() {
                return Ok(gate.await.expect("gate dropped"));
            }
            if let Some(delay) = self.probe_delay {
                tokio::time::sleep(delay).await;
            }
            self.probes
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(task(task_id, TaskStatus::Pending, None)))
        }

        async fn download(&self, _task_id: &str, _dest: &Path) -> Result<u64, TransportError> {
            unimplemented!("poller never downloads")
        }

        async fn health(&self) -> Result<ServiceHealth, TransportError> {
            unimplemented!("poller never checks health")
        }

        async fn cleanup(&self, _task_id: &str) -> Result<(), TransportError> {
            unimplemented!("poller never cleans up")
        }

        fn download_url(&self, task_id: &str) -> String {
            format!("http://localhost:5000/api/download/{task_id}")
        }
    }

    fn config(interval_secs: u64, ceiling_secs: u64) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(interval_secs),
            ceiling: Duration::from_secs(ceiling_secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_updates_until_terminal_then_stops() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(task("t1", TaskStatus::Processing, Some(40.0))),
            Ok(task("t1", TaskStatus::Completed, None)),
        ]));
        let (update_tx, mut update_rx) = mpsc::channel(16);
        let poller = StatusPoller::spawn(
            transport.clone(),
            "t1".to_string(),
            config(2, 600),
            update_tx,
        );

        let first = update_rx.recv().await.unwrap();
        assert_eq!(first.poller_id, poller.id());
        assert_eq!(first.task_id, "t1");
        let PollerUpdateKind::Status(t) = &first.kind else {
            panic!("expected a status update");
        };
        assert_eq!(t.progress, Some(40.0));

        let second = update_rx.recv().await.unwrap();
        let PollerUpdateKind::Status(t) = &second.kind else {
            panic!("expected a status update");
        };
        assert_eq!(t.status, TaskStatus::Completed);

        // Loop exits after the terminal delivery; its sender drops.
        assert!(update_rx.recv().await.is_none());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn first_probe_waits_one_full_interval() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let (update_tx, _update_rx) = mpsc::channel(16);
        let _poller = StatusPoller::spawn(
            transport.clone(),
            "t1".to_string(),
            config(2, 600),
            update_tx,
        );

        // Let the spawned loop reach its first `sleep` and register the
        // timer against the paused clock before we advance it.
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(1999)).await;
        tokio::task::yield_now().await;
        assert_eq!(transport.calls(), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cadence_runs_probe_end_to_probe_start() {
        // Each probe takes 3s against a 2s interval: ticks must land at
        // 2s, 7s, 12s rather than piling up on a fixed 2s grid.
        let transport = Arc::new(ScriptedTransport::slow(
            vec![
                Ok(task("t1", TaskStatus::Processing, None)),
                Ok(task("t1", TaskStatus::Processing, None)),
            ],
            Duration::from_secs(3),
        ));
        let (update_tx, mut update_rx) = mpsc::channel(16);
        let _poller = StatusPoller::spawn(
            transport.clone(),
            "t1".to_string(),
            config(2, 600),
            update_tx,
        );

        let settle = || async {
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
        };

        // Let the spawned loop register its first timer against the
        // paused clock before we advance it.
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(transport.calls(), 1);

        // t=4.5s: a wall-clock-fixed 2s grid would have fired again at
        // 4s; the first probe is still in flight, so nothing may start.
        tokio::time::advance(Duration::from_millis(2500)).await;
        settle().await;
        assert_eq!(transport.calls(), 1);
        assert!(update_rx.try_recv().is_err());

        // t=5s: the first probe lands and its update is delivered.
        tokio::time::advance(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(transport.calls(), 1);
        assert!(update_rx.try_recv().is_ok());

        // t=6.999s: still inside the post-probe pause.
        tokio::time::advance(Duration::from_millis(1999)).await;
        settle().await;
        assert_eq!(transport.calls(), 1);

        // t=7s: one interval after the first probe ended.
        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_failures_are_swallowed_and_polling_continues() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(probe_error()),
            Ok(task("t1", TaskStatus::Processing, Some(10.0))),
            Err(probe_error()),
            Ok(task("t1", TaskStatus::Completed, None)),
        ]));
        let (update_tx, mut update_rx) = mpsc::channel(16);
        let _poller = StatusPoller::spawn(
            transport.clone(),
            "t1".to_string(),
            config(2, 600),
            update_tx,
        );

        let mut statuses = Vec::new();
        while let Some(update) = update_rx.recv().await {
            if let PollerUpdateKind::Status(t) = update.kind {
                statuses.push(t.status);
            }
        }
        // Only the two successful probes surface; errors never do.
        assert_eq!(statuses, vec![TaskStatus::Processing, TaskStatus::Completed]);
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn ceiling_expiry_is_promoted_to_a_timed_out_delivery() {
        // Never-terminal service; 2s interval with a 5s ceiling gives
        // probes at 2s and 4s, then the 6s tick trips the budget.
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(task("t1", TaskStatus::Pending, None)),
            Ok(task("t1", TaskStatus::Pending, None)),
        ]));
        let (update_tx, mut update_rx) = mpsc::channel(16);
        let _poller = StatusPoller::spawn(
            transport.clone(),
            "t1".to_string(),
            config(2, 5),
            update_tx,
        );

        let mut kinds = Vec::new();
        while let Some(update) = update_rx.recv().await {
            kinds.push(update.kind);
        }
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], PollerUpdateKind::Status(_)));
        assert!(matches!(kinds[1], PollerUpdateKind::Status(_)));
        assert!(matches!(kinds[2], PollerUpdateKind::TimedOut));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_poller_discards_an_in_flight_probe() {
        let (gate_tx, gate_rx) = oneshot::channel();
        let transport = Arc::new(ScriptedTransport::gated(gate_rx));
        let (update_tx, mut update_rx) = mpsc::channel(16);
        let poller = StatusPoller::spawn(
            transport.clone(),
            "t1".to_string(),
            config(2, 600),
            update_tx,
        );

        // Let the spawned loop register its first timer against the
        // paused clock before we advance it.
        tokio::task::yield_now().await;

        // Reach the probe and leave it hanging on the gate.
        tokio::time::advance(Duration::from_secs(2)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.calls(), 1);

        poller.cancel();
        // Resolve the in-flight probe after cancellation.
        let _ = gate_tx.send(task("t1", TaskStatus::Completed, None));

        // The loop must exit without delivering anything.
        assert!(update_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_safe_after_completion() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(task(
            "t1",
            TaskStatus::Completed,
            None,
        ))]));
        let (update_tx, mut update_rx) = mpsc::channel(16);
        let poller = StatusPoller::spawn(
            transport.clone(),
            "t1".to_string(),
            config(2, 600),
            update_tx,
        );

        assert!(update_rx.recv().await.is_some());
        assert!(update_rx.recv().await.is_none());

        // Natural completion already ended the loop; cancelling now
        // (twice) must be a quiet no-op.
        poller.cancel();
        poller.cancel();
        assert_eq!(transport.calls(), 1);
    }
}
