use reaper_panel::{
    BridgeAccessor, ConnectionMonitor, ConnectionState, HostBridge, HostFault, HostSlot,
    MonitorConfig, Panel,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct ScriptedHost {
    tracks: Mutex<Result<Value, HostFault>>,
    fail_commands: AtomicBool,
    list_calls: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

impl ScriptedHost {
    fn new(tracks: Value) -> Arc<Self> {
        Arc::new(Self {
            tracks: Mutex::new(Ok(tracks)),
            fail_commands: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        })
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

impl HostBridge for ScriptedHost {
    fn get_track_list(&self) -> Result<Value, HostFault> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.tracks.lock().unwrap().clone()
    }

    fn run_command(&self, command_id: &str) -> Result<(), HostFault> {
        self.commands.lock().unwrap().push(command_id.to_string());
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(HostFault::new("action not found"));
        }
        Ok(())
    }
}

fn two_tracks() -> Value {
    json!(["Track 1", "Track 2"])
}

fn new_monitor(slot: &HostSlot) -> ConnectionMonitor {
    ConnectionMonitor::new(BridgeAccessor::new(slot.clone()), &MonitorConfig::default())
}

#[test]
fn state_follows_the_most_recent_presence_check() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());
    let mut monitor = new_monitor(&slot);

    let script = [true, true, false, false, true, false, true, true, true, false];
    for present in script {
        if present {
            slot.install(&host);
        } else {
            slot.clear();
        }
        monitor.tick();
        assert_eq!(monitor.state().is_connected(), present);
    }

    // One fetch per disconnected -> connected edge.
    assert_eq!(host.list_calls(), 3);
}

#[test]
fn absent_at_start() {
    let slot = HostSlot::new();
    let mut monitor = new_monitor(&slot);
    monitor.tick();
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
    assert!(monitor.tracks().is_empty());
}

#[test]
fn stale_tracks_survive_disconnection() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());
    let mut monitor = new_monitor(&slot);

    slot.install(&host);
    monitor.tick();
    assert_eq!(monitor.state(), ConnectionState::Connected);
    assert_eq!(monitor.tracks(), ["Track 1", "Track 2"]);

    drop(host);
    monitor.tick();
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
    assert_eq!(monitor.tracks(), ["Track 1", "Track 2"]);
}

#[test]
fn faulting_fetch_leaves_tracks_untouched() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());
    *host.tracks.lock().unwrap() = Err(HostFault::new("project not loaded"));
    let mut monitor = new_monitor(&slot);

    slot.install(&host);
    monitor.tick();
    assert_eq!(monitor.state(), ConnectionState::Connected);
    assert!(monitor.track_list().is_none());
    assert_eq!(host.list_calls(), 1);
}

#[test]
fn reconnect_replaces_tracks_wholesale() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());
    let mut monitor = new_monitor(&slot);

    slot.install(&host);
    monitor.tick();
    slot.clear();
    monitor.tick();

    *host.tracks.lock().unwrap() = Ok(json!(["Drums"]));
    slot.install(&host);
    monitor.tick();
    assert_eq!(monitor.tracks(), ["Drums"]);
}

#[test]
fn send_command_while_disconnected_is_not_dispatched() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());
    let mut monitor = new_monitor(&slot);

    slot.install(&host);
    monitor.tick();
    slot.clear();
    monitor.tick();

    slot.install(&host);
    monitor.send_command("X");
    assert!(host.commands().is_empty());
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
}

#[test]
fn command_failures_never_escape() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());
    host.fail_commands.store(true, Ordering::SeqCst);
    let mut monitor = new_monitor(&slot);

    slot.install(&host);
    monitor.tick();
    monitor.send_command("X");
    assert_eq!(host.commands(), vec!["X"]);
    assert_eq!(monitor.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn panel_checks_immediately_and_every_interval() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());
    slot.install(&host);

    let start = tokio::time::Instant::now();
    let panel = Panel::activate(slot.clone(), MonitorConfig::default());
    let mut snapshots = panel.subscribe();

    snapshots.changed().await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
    let snap = snapshots.borrow_and_update().clone();
    assert_eq!(snap.status, ConnectionState::Connected);
    assert_eq!(snap.track_names(), ["Track 1", "Track 2"]);
    assert_eq!(panel.tracks(), vec!["Track 1", "Track 2"]);

    drop(host);
    snapshots.changed().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    let snap = snapshots.borrow_and_update().clone();
    assert_eq!(snap.status, ConnectionState::Disconnected);
    assert_eq!(snap.track_names(), ["Track 1", "Track 2"]);
    assert_eq!(panel.state(), ConnectionState::Disconnected);

    panel.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn panel_dispatches_default_command_when_connected() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());

    let panel = Panel::activate(slot.clone(), MonitorConfig::default());
    let mut snapshots = panel.subscribe();

    panel.send_default_command();
    assert!(host.commands().is_empty());

    slot.install(&host);
    snapshots.changed().await.unwrap();
    assert!(snapshots.borrow_and_update().can_send_command());

    panel.send_default_command();
    assert_eq!(host.commands(), vec!["_SWS_SAVEALLSELWITHTIME"]);

    panel.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_the_timer() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());

    let panel = Panel::activate(slot.clone(), MonitorConfig::default());
    let mut snapshots = panel.subscribe();
    assert!(panel.is_polling());
    panel.teardown().await;

    slot.install(&host);
    tokio::time::advance(Duration::from_secs(30)).await;
    tokio::task::yield_now().await;

    assert_eq!(host.list_calls(), 0);
    assert!(snapshots.changed().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_panel_stops_polling() {
    let slot = HostSlot::new();
    let host = ScriptedHost::new(two_tracks());

    let panel = Panel::activate(slot.clone(), MonitorConfig::default());
    tokio::task::yield_now().await;
    drop(panel);

    slot.install(&host);
    tokio::time::advance(Duration::from_secs(30)).await;
    tokio::task::yield_now().await;

    assert_eq!(host.list_calls(), 0);
}

/// Blocks in `get_track_list` until released.
struct GatedHost {
    entered: AtomicBool,
    release: Mutex<mpsc::Receiver<()>>,
    commands: AtomicUsize,
}

impl HostBridge for GatedHost {
    fn get_track_list(&self) -> Result<Value, HostFault> {
        self.entered.store(true, Ordering::SeqCst);
        let _ = self
            .release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(5));
        Ok(two_tracks())
    }

    fn run_command(&self, _command_id: &str) -> Result<(), HostFault> {
        self.commands.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_track_fetch_does_not_block_readers() {
    let (release_tx, release_rx) = mpsc::channel();
    let host = Arc::new(GatedHost {
        entered: AtomicBool::new(false),
        release: Mutex::new(release_rx),
        commands: AtomicUsize::new(0),
    });
    let slot = HostSlot::new();
    slot.install(&host);

    let panel = Panel::activate(slot, MonitorConfig::default());
    let mut snapshots = panel.subscribe();

    tokio::time::timeout(Duration::from_secs(2), async {
        while !host.entered.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("fetch never started");

    let started = Instant::now();
    assert_eq!(panel.state(), ConnectionState::Connected);
    assert!(panel.tracks().is_empty());
    assert!(panel.snapshot().tracks.is_none());
    panel.send_command("X");
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(host.commands.load(Ordering::SeqCst), 1);

    release_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), snapshots.changed())
        .await
        .expect("snapshot never published")
        .unwrap();
    assert_eq!(
        snapshots.borrow_and_update().track_names(),
        ["Track 1", "Track 2"]
    );

    panel.teardown().await;
}
