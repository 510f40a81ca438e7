//! Durability modes governing when the WAL is fsynced.

use serde::{Deserialize, Serialize};

/// Controls when `fsync` (or platform equivalent) runs on the WAL, trading
/// latency against the crash window named in spec §4.2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DurabilityMode {
    /// Never fsync proactively; rely on OS buffering. Suitable only for
    /// throwaway/test stores — the reference default is `Strict`.
    None,
    /// fsync on every append.
    Strict,
    /// fsync every `interval_ms` or every `batch_size` writes, whichever
    /// comes first.
    Batched { interval_ms: u64, batch_size: u64 },
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::Strict
    }
}
