mod bridge;
mod config;
mod host;
mod monitor;
mod poller;

pub use crate::bridge::{BridgeAccessor, BridgeError};
pub use crate::config::{
    ConfigError, MonitorConfig, DEFAULT_COMMAND, DEFAULT_COMMAND_ENV, DEFAULT_POLL_INTERVAL,
    POLL_MS_ENV,
};
pub use crate::host::{HostBridge, HostFault, HostSlot};
pub use crate::monitor::{dispatch_command, ConnectionMonitor, PresenceEdge};
pub use crate::poller::{PollTask, SharedMonitor};
pub use panel_protocol::{ConnectionState, PanelSnapshot};

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::warn;

/// An activated panel: the monitor plus the poller that drives it.
///
/// This is everything the presentation layer talks to. Dropping it stops polling.
pub struct Panel {
    monitor: SharedMonitor,
    poller: PollTask,
}

impl Panel {
    /// Starts polling `slot` right away. Must be called from within a tokio runtime.
    pub fn activate(slot: HostSlot, config: MonitorConfig) -> Self {
        let monitor = ConnectionMonitor::new(BridgeAccessor::new(slot), &config);
        let monitor: SharedMonitor = Arc::new(Mutex::new(monitor));
        let poller = PollTask::spawn(Arc::clone(&monitor), config.poll_interval);
        Self { monitor, poller }
    }

    pub fn state(&self) -> ConnectionState {
        self.with_monitor(|m| m.state()).unwrap_or_default()
    }

    pub fn tracks(&self) -> Vec<String> {
        self.with_monitor(|m| m.tracks().to_vec()).unwrap_or_default()
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        self.with_monitor(|m| m.snapshot()).unwrap_or_default()
    }

    /// Runs the host call after releasing the monitor, so a slow host never stalls readers.
    pub fn send_command(&self, command_id: &str) {
        let Some(bridge) = self.with_monitor(|m| m.command_bridge()) else {
            warn!(command_id, "monitor lock poisoned, command dropped");
            return;
        };
        monitor::dispatch_command(bridge.as_ref(), command_id);
    }

    pub fn send_default_command(&self) {
        let Some((bridge, command_id)) =
            self.with_monitor(|m| (m.command_bridge(), m.default_command().to_string()))
        else {
            warn!("monitor lock poisoned, default command dropped");
            return;
        };
        monitor::dispatch_command(bridge.as_ref(), &command_id);
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.poller.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub async fn teardown(self) {
        self.poller.shutdown().await;
    }

    fn with_monitor<T>(&self, f: impl FnOnce(&ConnectionMonitor) -> T) -> Option<T> {
        let guard = self.monitor.lock().ok()?;
        Some(f(&guard))
    }
}
