//! Process-wide storage mode.
//!
//! # State Transitions
//! ```text
//! Durable → Degraded: first API request that observes a non-connected database
//! Degraded → Durable: never (no reconciliation within a process)
//! ```
//!
//! # Design Decisions
//! - Single writer (the health gate), many readers
//! - Transition is a compare-and-set so exactly one request wins the switch

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Which backend is authoritative.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StorageMode {
    #[serde(rename = "database")]
    Durable = 0,
    #[serde(rename = "memory")]
    Degraded = 1,
}

impl StorageMode {
    pub fn label(self) -> &'static str {
        match self {
            StorageMode::Durable => "database",
            StorageMode::Degraded => "memory",
        }
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared storage mode flag, injected wherever a backend has to be chosen.
#[derive(Debug)]
pub struct StorageModeFlag {
    mode: AtomicU8,
}

impl StorageModeFlag {
    /// Create a flag in optimistic durable mode.
    pub fn new() -> Self {
        Self {
            mode: AtomicU8::new(StorageMode::Durable as u8),
        }
    }

    pub fn current(&self) -> StorageMode {
        match self.mode.load(Ordering::Acquire) {
            0 => StorageMode::Durable,
            _ => StorageMode::Degraded,
        }
    }

    /// Switch to degraded mode.
    ///
    /// Returns `true` only for the caller that performed the transition.
    pub fn degrade(&self) -> bool {
        self.mode
            .compare_exchange(
                StorageMode::Durable as u8,
                StorageMode::Degraded as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for StorageModeFlag {
    fn default() -> Self {
        Self::new()
    }
}
