use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use thiserror::Error;

/// Failure reported by the host while serving a bridge call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostFault(pub String);

impl HostFault {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Capability object the host runtime exposes to the panel.
///
/// The track list is handed back untyped; the accessor decides whether its
/// shape is usable.
pub trait HostBridge: Send + Sync {
    fn get_track_list(&self) -> Result<Value, HostFault>;
    fn run_command(&self, command_id: &str) -> Result<(), HostFault>;
}

/// Injection point the surrounding runtime uses to publish or withdraw its bridge.
///
/// Holds only a weak reference: the host owns its bridge and may drop it at any time.
#[derive(Clone, Default)]
pub struct HostSlot {
    inner: Arc<RwLock<Option<Weak<dyn HostBridge>>>>,
}

impl HostSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install<H: HostBridge + 'static>(&self, host: &Arc<H>) {
        let weak: Weak<H> = Arc::downgrade(host);
        self.bind(weak as Weak<dyn HostBridge>);
    }

    /// Same as [`HostSlot::install`] for a host already held as a trait object.
    pub fn install_dyn(&self, host: &Arc<dyn HostBridge>) {
        self.bind(Arc::downgrade(host));
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn current(&self) -> Option<Arc<dyn HostBridge>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()?
            .upgrade()
    }

    fn bind(&self, weak: Weak<dyn HostBridge>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(weak);
    }
}
