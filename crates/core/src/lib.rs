//! Core data model, error taxonomy, and configuration shared by every layer
//! of the document-management storage and ingestion engine.
//!
//! This crate has no I/O of its own — it is the vocabulary the durability,
//! storage, objectstore, ingest, and engine crates build on.

pub mod config;
pub mod error;
pub mod folder;
pub mod id;
pub mod record;

pub use config::{ObjectStoreConfig, PoolConfig, StoreConfig};
pub use error::{Error, Result};
pub use id::{shard_coordinate, shard_dir_name, IdAllocator, RecordId, ShardCoordinate};
pub use record::{ExtractedValue, Record, RecordPatch, RecordStatus};
