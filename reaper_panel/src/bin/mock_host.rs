use clap::Parser;
use rand::Rng;
use reaper_panel::{HostBridge, HostFault, HostSlot, MonitorConfig, Panel};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Drives the panel against a fake REAPER that attaches and detaches on a schedule.
#[derive(Parser, Debug)]
#[command(name = "mock_host")]
struct Args {
    /// How long the mock host stays attached each cycle.
    #[arg(long, default_value_t = 12_000)]
    attached_ms: u64,

    /// How long the mock host stays away between attachments.
    #[arg(long, default_value_t = 8_000)]
    detached_ms: u64,

    /// Overrides REAPER_PANEL_POLL_MS.
    #[arg(long)]
    poll_ms: Option<u64>,

    #[arg(long, value_delimiter = ',', default_value = "Track 1,Track 2")]
    tracks: Vec<String>,

    /// Probability in [0, 1] that a dispatched command fails on the host side.
    #[arg(long, default_value_t = 0.0, value_parser = parse_probability)]
    command_failure_rate: f64,

    #[arg(long)]
    run_for_ms: Option<u64>,
}

fn parse_probability(raw: &str) -> Result<f64, String> {
    let p: f64 = raw.trim().parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{raw} is not a probability in [0, 1]"))
    }
}

struct MockHost {
    tracks: Vec<String>,
    command_failure_rate: f64,
}

impl HostBridge for MockHost {
    fn get_track_list(&self) -> Result<Value, HostFault> {
        Ok(Value::from(self.tracks.clone()))
    }

    fn run_command(&self, command_id: &str) -> Result<(), HostFault> {
        if rand::thread_rng().gen_bool(self.command_failure_rate) {
            return Err(HostFault::new(format!("mock host rejected {command_id}")));
        }
        info!(command_id, "mock host executed command");
        Ok(())
    }
}

async fn drive_host(slot: HostSlot, args: Arc<Args>) {
    loop {
        let host = Arc::new(MockHost {
            tracks: args.tracks.clone(),
            command_failure_rate: args.command_failure_rate,
        });
        slot.install(&host);
        info!("mock host attached");
        tokio::time::sleep(Duration::from_millis(args.attached_ms)).await;

        // Dropping the only strong reference is what the panel sees as disappearance.
        drop(host);
        info!("mock host detached");
        tokio::time::sleep(Duration::from_millis(args.detached_ms)).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Arc::new(Args::parse());

    let mut config = MonitorConfig::from_env()?;
    if let Some(ms) = args.poll_ms {
        config.poll_interval = Duration::from_millis(ms.max(1));
    }

    let slot = HostSlot::new();
    let panel = Panel::activate(slot.clone(), config);
    let mut snapshots = panel.subscribe();
    let driver = tokio::spawn(drive_host(slot, Arc::clone(&args)));

    let run_for = args.run_for_ms;
    let deadline = async move {
        match run_for {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                info!(
                    status = snap.status_label(),
                    tracks = ?snap.track_names(),
                    placeholder = snap.track_placeholder(),
                    "panel updated"
                );
                if snap.can_send_command() {
                    panel.send_default_command();
                }
            }
        }
    }

    driver.abort();
    panel.teardown().await;
    Ok(())
}
