use axum::{extract::State, Json};
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

use crate::health::{observe_state, StorageMode};
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

/// Read-only snapshot of storage health and process vitals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub storage_mode: StorageMode,
    pub connection_state: u8,
    pub connection_label: &'static str,
    pub uptime_seconds: u64,
    #[serde(rename = "heapUsedMB")]
    pub heap_used_mb: f64,
    #[serde(rename = "heapTotalMB")]
    pub heap_total_mb: f64,
    pub environment: &'static str,
    pub version: &'static str,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_diagnostics(State(state): State<AppState>) -> Json<Diagnostics> {
    Json(snapshot(&state))
}

/// Build the diagnostics payload. Never writes the storage mode.
pub fn snapshot(state: &AppState) -> Diagnostics {
    let connection = observe_state(state.monitor.as_ref());
    let (used, total) = process_memory().unwrap_or_default();

    Diagnostics {
        storage_mode: state.mode.current(),
        connection_state: connection.code(),
        connection_label: connection.label(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        heap_used_mb: to_mb(used),
        heap_total_mb: to_mb(total),
        environment: state.config.load().environment.as_str(),
        version: env!("CARGO_PKG_VERSION"),
    }
}

/// Resident and virtual size of this process, in bytes.
fn process_memory() -> Option<(u64, u64)> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).map(|p| (p.memory(), p.virtual_memory()))
}

fn to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}
