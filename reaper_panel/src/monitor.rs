use crate::bridge::{BridgeAccessor, BridgeError};
use crate::config::MonitorConfig;
use panel_protocol::{ConnectionState, PanelSnapshot};
use tracing::{debug, info, warn};

/// Result of one presence check.
pub enum PresenceEdge {
    Unchanged,
    /// Just connected; fetch the track list through this accessor.
    Connected(BridgeAccessor),
    Disconnected,
}

impl PresenceEdge {
    pub fn is_transition(&self) -> bool {
        !matches!(self, PresenceEdge::Unchanged)
    }
}

/// Owns the panel's view of the host: connection state plus the last track list.
///
/// Driven by [`ConnectionMonitor::tick`], or by [`ConnectionMonitor::check_presence`]
/// followed by [`ConnectionMonitor::apply_tracks`] when the fetch runs elsewhere.
/// Callers guarantee ticks never overlap.
pub struct ConnectionMonitor {
    bridge: BridgeAccessor,
    state: ConnectionState,
    // None until the first successful fetch.
    tracks: Option<Vec<String>>,
    default_command: String,
    checked_once: bool,
}

impl ConnectionMonitor {
    pub fn new(bridge: BridgeAccessor, config: &MonitorConfig) -> Self {
        Self {
            bridge,
            state: ConnectionState::Disconnected,
            tracks: None,
            default_command: config.default_command.clone(),
            checked_once: false,
        }
    }

    /// Runs one presence check, fetching tracks inline on the connect edge.
    /// Returns true if the rendered snapshot changed.
    pub fn tick(&mut self) -> bool {
        let edge = self.check_presence();
        if let PresenceEdge::Connected(bridge) = &edge {
            let fetched = bridge.list_tracks();
            self.apply_tracks(fetched);
        }
        edge.is_transition()
    }

    /// Updates the connection state. Never calls into the host beyond the slot lookup.
    pub fn check_presence(&mut self) -> PresenceEdge {
        let present = self.bridge.is_available();
        let first_check = !self.checked_once;
        self.checked_once = true;

        match (self.state, present) {
            (ConnectionState::Disconnected, true) => {
                info!("host bridge detected, connected to REAPER");
                self.state = ConnectionState::Connected;
                PresenceEdge::Connected(self.bridge.clone())
            }
            (ConnectionState::Connected, false) => {
                info!("host bridge gone, not running inside REAPER");
                self.state = ConnectionState::Disconnected;
                PresenceEdge::Disconnected
            }
            (ConnectionState::Disconnected, false) if first_check => {
                info!("host bridge not available, not running inside REAPER");
                PresenceEdge::Unchanged
            }
            _ => {
                debug!(state = ?self.state, "presence unchanged");
                PresenceEdge::Unchanged
            }
        }
    }

    /// Applies the outcome of the fetch started by a [`PresenceEdge::Connected`].
    pub fn apply_tracks(&mut self, fetched: Result<Vec<String>, BridgeError>) {
        if !self.state.is_connected() {
            debug!("disconnected before the track list arrived, dropping it");
            return;
        }
        match fetched {
            Ok(tracks) => {
                debug!(count = tracks.len(), "track list refreshed");
                self.tracks = Some(tracks);
            }
            Err(e) => warn!(error = %e, "error fetching tracks"),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Last successfully fetched list; empty if none was ever fetched.
    pub fn tracks(&self) -> &[String] {
        self.tracks.as_deref().unwrap_or(&[])
    }

    pub fn track_list(&self) -> Option<&[String]> {
        self.tracks.as_deref()
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            status: self.state,
            tracks: self.tracks.clone(),
        }
    }

    pub fn send_command(&self, command_id: &str) {
        dispatch_command(self.command_bridge().as_ref(), command_id);
    }

    pub fn send_default_command(&self) {
        self.send_command(&self.default_command);
    }

    pub fn default_command(&self) -> &str {
        &self.default_command
    }

    /// The accessor to dispatch through, or `None` while disconnected.
    pub fn command_bridge(&self) -> Option<BridgeAccessor> {
        self.state.is_connected().then(|| self.bridge.clone())
    }
}

/// Dispatches a command and swallows the outcome. `None` means not connected.
pub fn dispatch_command(bridge: Option<&BridgeAccessor>, command_id: &str) {
    let Some(bridge) = bridge else {
        debug!(command_id, "not connected, command not dispatched");
        return;
    };
    match bridge.run_command(command_id) {
        Ok(()) => debug!(command_id, "command sent to REAPER"),
        Err(e) => warn!(command_id, error = %e, "error sending command to REAPER"),
    }
}
