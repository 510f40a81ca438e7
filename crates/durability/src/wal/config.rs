//! WAL-writer configuration.

use super::mode::DurabilityMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalConfigError {
    #[error("segment_size must be positive")]
    ZeroSegmentSize,
}

/// Tunables for [`super::writer::WalWriter`].
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Rotate to a new segment once the current one would exceed this size.
    pub segment_size: u64,
    pub mode: DurabilityMode,
    /// Mutations per fsync under ambient (non-`Batched`) accounting, mirrors
    /// spec §6 `wal_fsync_interval` for `Strict` mode bookkeeping/metrics.
    pub fsync_interval: u64,
}

impl Default for WalConfig {
    fn default() -> Self {
        WalConfig {
            segment_size: 8 * 1024 * 1024,
            mode: DurabilityMode::default(),
            fsync_interval: 50,
        }
    }
}

impl WalConfig {
    pub fn validate(&self) -> Result<(), WalConfigError> {
        if self.segment_size == 0 {
            return Err(WalConfigError::ZeroSegmentSize);
        }
        Ok(())
    }
}
