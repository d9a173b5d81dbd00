//! Storage health and failover subsystem.
//!
//! # Data Flow
//! ```text
//! Prober (probe.rs):
//!     Periodic timer
//!     → Ping database
//!     → Update ConnectionStateCell (connection.rs)
//!
//! Health gate (gate.rs), every request:
//!     Auth or non-API path → bypass
//!     StorageModeFlag (mode.rs) already degraded → stamp degraded
//!     Otherwise read ConnectionMonitor
//!         connected     → stamp durable
//!         anything else → degrade process, stamp degraded
//! ```
//!
//! # Design Decisions
//! - The gate is the only writer of the storage mode
//! - Degradation is one-way for the lifetime of the process
//! - The decision is made once per request and carried in request extensions

pub mod connection;
pub mod gate;
pub mod mode;
pub mod probe;

pub use connection::{
    observe_state, ConnectionMonitor, ConnectionState, ConnectionStateCell, MonitorError,
};
pub use gate::{HealthGate, StorageContext};
pub use mode::{StorageMode, StorageModeFlag};
