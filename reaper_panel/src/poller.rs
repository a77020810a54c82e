use crate::bridge::BridgeError;
use crate::monitor::{ConnectionMonitor, PresenceEdge};
use panel_protocol::PanelSnapshot;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub type SharedMonitor = Arc<Mutex<ConnectionMonitor>>;

/// Recurring presence check. Cancelled on [`PollTask::shutdown`] or when dropped.
pub struct PollTask {
    cancel: CancellationToken,
    join_handle: Option<JoinHandle<()>>,
    snapshots: watch::Receiver<PanelSnapshot>,
}

impl PollTask {
    /// Must be called from within a tokio runtime. The first check runs immediately.
    pub fn spawn(monitor: SharedMonitor, period: Duration) -> Self {
        let initial = match monitor.lock() {
            Ok(m) => m.snapshot(),
            Err(_) => PanelSnapshot::default(),
        };
        let (tx, rx) = watch::channel(initial);
        let cancel = CancellationToken::new();

        let join_handle = tokio::spawn(run_poller(monitor, period, tx, cancel.clone()));
        info!(?period, "presence poller started");

        Self {
            cancel,
            join_handle: Some(join_handle),
            snapshots: rx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.snapshots.clone()
    }

    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(h) = self.join_handle.take() {
            h.abort();
        }
    }
}

async fn run_poller(
    monitor: SharedMonitor,
    period: Duration,
    tx: watch::Sender<PanelSnapshot>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        // Only the slot lookup happens under the lock.
        let edge = {
            let Ok(mut guard) = monitor.lock() else {
                warn!("monitor lock poisoned, stopping poller");
                break;
            };
            guard.check_presence()
        };

        if let PresenceEdge::Connected(bridge) = &edge {
            let bridge = bridge.clone();
            let fetch = tokio::task::spawn_blocking(move || bridge.list_tracks());
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                joined = fetch => joined.unwrap_or_else(|e| {
                    warn!(error = %e, "track fetch task failed");
                    Err(BridgeError::Unavailable)
                }),
            };

            let Ok(mut guard) = monitor.lock() else {
                warn!("monitor lock poisoned, stopping poller");
                break;
            };
            guard.apply_tracks(fetched);
        }

        if !edge.is_transition() {
            continue;
        }
        let snapshot = {
            let Ok(guard) = monitor.lock() else {
                warn!("monitor lock poisoned, stopping poller");
                break;
            };
            guard.snapshot()
        };
        tx.send_replace(snapshot);
    }

    info!("presence poller stopped");
}
