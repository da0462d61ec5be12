//! Periodic statistics polling
//!
//! A single task runs one cycle, waits for the interval, and runs the next, so at most
//! one statistics request is outstanding. Extra refreshes requested by the operation
//! coordinator queue behind the running cycle rather than overlapping it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use queuedash_core::{FetchError, Snapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::StatisticsSource;

/// What the poller currently knows
#[derive(Debug, Clone)]
pub struct PollState {
    /// Last successfully fetched snapshot
    pub snapshot: Arc<Snapshot>,
    /// Completion time of the last successful cycle
    pub last_update: Option<DateTime<Utc>>,
    /// Message of the last failed cycle, cleared by the next success
    pub last_error: Option<String>,
    /// True until the first cycle completes, whatever its outcome
    pub is_loading: bool,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(Snapshot::default()),
            last_update: None,
            last_error: None,
            is_loading: true,
        }
    }
}

struct Shared {
    source: Arc<dyn StatisticsSource>,
    state: RwLock<PollState>,
    cycle: Mutex<()>,
    torn_down: AtomicBool,
    version: watch::Sender<u64>,
}

/// Statistics poller. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Poller {
    shared: Arc<Shared>,
    interval: Duration,
}

impl Poller {
    pub fn new(source: Arc<dyn StatisticsSource>, interval: Duration) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                source,
                state: RwLock::new(PollState::default()),
                cycle: Mutex::new(()),
                torn_down: AtomicBool::new(false),
                version,
            }),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Copy of the current state; the snapshot itself is shared
    pub fn state(&self) -> PollState {
        self.shared.state.read().clone()
    }

    /// Receiver bumped after every applied cycle
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.torn_down.load(Ordering::SeqCst)
    }

    /// True when no cycle has succeeded within `max_age` of `now`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        match self.shared.state.read().last_update {
            Some(at) => now.signed_duration_since(at) > max_age,
            None => true,
        }
    }

    /// Run one poll cycle, waiting for any cycle already in progress
    pub async fn refresh(&self) {
        let _cycle = self.shared.cycle.lock().await;
        if self.is_torn_down() {
            return;
        }

        let result = self.shared.source.fetch_statistics().await;
        self.apply(result);
    }

    fn apply(&self, result: Result<Snapshot, FetchError>) {
        if self.is_torn_down() {
            debug!("Poller stopped, discarding statistics result");
            return;
        }

        {
            let mut state = self.shared.state.write();
            match result {
                Ok(snapshot) => {
                    debug!(queues = snapshot.len(), "Statistics updated");
                    state.snapshot = Arc::new(snapshot);
                    state.last_update = Some(Utc::now());
                    state.last_error = None;
                }
                Err(e) => {
                    warn!(error = %e, "Statistics poll failed");
                    state.last_error = Some(e.to_string());
                }
            }
            state.is_loading = false;
        }

        self.shared.version.send_modify(|v| *v += 1);
    }

    /// Spawn the polling task. The first cycle runs immediately.
    pub fn start(&self) -> PollHandle {
        let (stop, mut stopped) = watch::channel(false);
        let poller = self.clone();

        info!(interval = ?self.interval, "Starting statistics poller");

        let task = tokio::spawn(async move {
            loop {
                poller.refresh().await;

                tokio::select! {
                    () = tokio::time::sleep(poller.interval) => {}
                    _ = stopped.changed() => break,
                }
            }
            debug!("Statistics poller exited");
        });

        PollHandle {
            stop,
            task: Some(task),
            shared: self.shared.clone(),
        }
    }
}

/// Running poll loop. Dropping the handle stops it.
pub struct PollHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl PollHandle {
    /// Stop the timer. A fetch already on the wire finishes but its result is dropped.
    pub fn stop(&self) {
        if !self.shared.torn_down.swap(true, Ordering::SeqCst) {
            info!("Stopping statistics poller");
        }
        let _ = self.stop.send(true);
    }

    /// Stop and wait for the task to exit
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
