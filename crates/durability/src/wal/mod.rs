//! Write-ahead log (spec §4.2, C2): append-only mutation journal with
//! segment rotation, configurable durability, and replay-then-truncate
//! recovery.

mod config;
pub mod frame;
mod mode;
mod reader;
mod record;
mod writer;

pub use config::{WalConfig, WalConfigError};
pub use mode::DurabilityMode;
pub use reader::{replay, truncate, ReadStopReason, ReplayResult, TruncateInfo};
pub use record::{Operation, WalEntry};
pub use writer::{list_segments, WalCounters, WalWriter};
