//! Process-wide accounting of live runtime resources
//!
//! The leak probe's whole purpose is to verify that resources acquired in an
//! iteration are actually released when the iteration scope exits. The ledger
//! makes that observable from inside the process: core handles and model
//! artifacts bump a counter on creation and another on drop, and tests assert
//! that the live counts return to their baseline.
//!
//! All counters are lock-free atomics; the ledger never blocks the loop it is
//! observing.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static CORES_CREATED: AtomicU64 = AtomicU64::new(0);
static CORES_RELEASED: AtomicU64 = AtomicU64::new(0);
static MODELS_CREATED: AtomicU64 = AtomicU64::new(0);
static MODELS_RELEASED: AtomicU64 = AtomicU64::new(0);

/// Handle to the process-wide resource counters
pub struct ResourceLedger;

impl ResourceLedger {
    pub(crate) fn record_core_created() {
        CORES_CREATED.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_core_released() {
        CORES_RELEASED.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_model_created() {
        MODELS_CREATED.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_model_released() {
        MODELS_RELEASED.fetch_add(1, Ordering::Relaxed);
    }

    /// Capture the current counter values
    pub fn snapshot() -> LedgerSnapshot {
        LedgerSnapshot {
            cores_created: CORES_CREATED.load(Ordering::Relaxed),
            cores_released: CORES_RELEASED.load(Ordering::Relaxed),
            models_created: MODELS_CREATED.load(Ordering::Relaxed),
            models_released: MODELS_RELEASED.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the resource counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    /// Total core handles ever created
    pub cores_created: u64,
    /// Total core handles released
    pub cores_released: u64,
    /// Total model artifacts ever created
    pub models_created: u64,
    /// Total model artifacts released
    pub models_released: u64,
}

impl LedgerSnapshot {
    /// Core handles currently alive
    pub fn live_cores(&self) -> u64 {
        self.cores_created.saturating_sub(self.cores_released)
    }

    /// Model artifacts currently alive
    pub fn live_models(&self) -> u64 {
        self.models_created.saturating_sub(self.models_released)
    }

    /// All live resources combined
    pub fn live_total(&self) -> u64 {
        self.live_cores() + self.live_models()
    }
}
