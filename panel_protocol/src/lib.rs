use serde::{Deserialize, Serialize};

pub const CONNECTED_LABEL: &str = "Connected to REAPER";
pub const DISCONNECTED_LABEL: &str = "Not connected to REAPER";
pub const NO_TRACKS_PLACEHOLDER: &str = "No tracks available or not connected to REAPER";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Everything the panel renders, captured at one point in time.
///
/// `tracks` is `None` until the first successful fetch; a fetched empty list is
/// `Some(vec![])`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelSnapshot {
    pub status: ConnectionState,
    #[serde(default)]
    pub tracks: Option<Vec<String>>,
}

impl PanelSnapshot {
    pub fn status_label(&self) -> &'static str {
        match self.status {
            ConnectionState::Connected => CONNECTED_LABEL,
            ConnectionState::Disconnected => DISCONNECTED_LABEL,
        }
    }

    /// The command button is only enabled while connected.
    pub fn can_send_command(&self) -> bool {
        self.status.is_connected()
    }

    pub fn track_names(&self) -> &[String] {
        self.tracks.as_deref().unwrap_or(&[])
    }

    pub fn track_placeholder(&self) -> Option<&'static str> {
        if self.track_names().is_empty() {
            Some(NO_TRACKS_PLACEHOLDER)
        } else {
            None
        }
    }
}
