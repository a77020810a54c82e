use crate::host::{HostFault, HostSlot};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("host bridge unavailable")]
    Unavailable,
    #[error("malformed track list: {detail}")]
    MalformedResponse { detail: String },
    #[error("command {command_id} failed: {detail}")]
    ExecutionFailed { command_id: String, detail: String },
}

/// Checked access to whatever bridge is currently bound in the slot.
///
/// The slot is re-read on every call; nothing here caches the host.
#[derive(Clone)]
pub struct BridgeAccessor {
    slot: HostSlot,
}

impl BridgeAccessor {
    pub fn new(slot: HostSlot) -> Self {
        Self { slot }
    }

    pub fn is_available(&self) -> bool {
        self.slot.current().is_some()
    }

    pub fn list_tracks(&self) -> Result<Vec<String>, BridgeError> {
        let host = self.slot.current().ok_or(BridgeError::Unavailable)?;
        let value = contain(|| host.get_track_list()).map_err(|detail| {
            tracing::debug!(%detail, "host faulted while listing tracks");
            BridgeError::Unavailable
        })?;
        serde_json::from_value::<Vec<String>>(value).map_err(|e| BridgeError::MalformedResponse {
            detail: e.to_string(),
        })
    }

    pub fn run_command(&self, command_id: &str) -> Result<(), BridgeError> {
        let host = self.slot.current().ok_or(BridgeError::Unavailable)?;
        contain(|| host.run_command(command_id)).map_err(|detail| BridgeError::ExecutionFailed {
            command_id: command_id.to_string(),
            detail,
        })
    }
}

// Host calls cross into code we do not own; a panic there must not unwind into the panel.
fn contain<T>(call: impl FnOnce() -> Result<T, HostFault>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(fault)) => Err(fault.to_string()),
        Err(payload) => Err(panic_message(&*payload)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("host panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("host panicked: {s}")
    } else {
        "host panicked".to_string()
    }
}
