//! Durable database connection state.
//!
//! # Responsibilities
//! - Represent the database client's readiness as a small enum
//! - Expose the current state through a synchronous, read-only query
//!
//! # Design Decisions
//! - State is a single atomic byte written by the prober, read by the gate
//! - Numeric codes are stable and surfaced verbatim in diagnostics
//! - Querying never performs I/O
//! - A monitor that errors or panics reads as disconnected

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;
use thiserror::Error;

/// Readiness of the durable database client.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected = 0,
    Connected = 1,
    Connecting = 2,
    Disconnecting = 3,
    Uninitialized = 99,
}

impl ConnectionState {
    /// Numeric state code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Uninitialized => "uninitialized",
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl From<u8> for ConnectionState {
    fn from(val: u8) -> Self {
        match val {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connected,
            2 => ConnectionState::Connecting,
            3 => ConnectionState::Disconnecting,
            _ => ConnectionState::Uninitialized,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure to read the connection state.
#[derive(Debug, Error)]
#[error("connection monitor unavailable: {0}")]
pub struct MonitorError(pub String);

/// Read-only view of the durable client's connection state.
pub trait ConnectionMonitor: Send + Sync {
    /// Current state as last reported by the client.
    fn current_state(&self) -> Result<ConnectionState, MonitorError>;
}

/// Read the monitor, treating an error or a panic as disconnected.
pub fn observe_state(monitor: &dyn ConnectionMonitor) -> ConnectionState {
    match catch_unwind(AssertUnwindSafe(|| monitor.current_state())) {
        Ok(Ok(state)) => state,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Connection monitor failed, treating as disconnected");
            ConnectionState::Disconnected
        }
        Err(_) => {
            tracing::warn!("Connection monitor panicked, treating as disconnected");
            ConnectionState::Disconnected
        }
    }
}

/// Atomic connection state cell shared between the prober and readers.
#[derive(Debug)]
pub struct ConnectionStateCell {
    state: AtomicU8,
}

impl ConnectionStateCell {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Uninitialized as u8),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::Acquire))
    }

    /// Store a new state, returning the previous one.
    pub fn set(&self, state: ConnectionState) -> ConnectionState {
        let prev = self.state.swap(state as u8, Ordering::AcqRel);
        crate::observability::metrics::record_connection_state(state);
        ConnectionState::from(prev)
    }
}

impl Default for ConnectionStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMonitor for ConnectionStateCell {
    fn current_state(&self) -> Result<ConnectionState, MonitorError> {
        Ok(self.get())
    }
}
