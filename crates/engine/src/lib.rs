//! Record Store API (C7) and Similarity Ranker (C12) — the facade other
//! collaborators (ingestion, and ultimately the out-of-scope HTTP surface)
//! are expected to depend on, composing the lower storage/durability/
//! objectstore crates behind the narrow contract of spec §4.7/§4.12.
//!
//! [`ingestion`] adapts [`store::RecordStore`] to the narrow
//! `RecordSink`/`EnrichmentSink` traits the ingestion pipeline depends on
//! (spec §9 "object polymorphism... becomes a narrow interface"). [`ops`]
//! exposes the `verify`/`compact`/`recover` library entry points named in
//! spec §6 as the only required CLI surface.

pub mod ingestion;
pub mod ops;
pub mod ranker;
pub mod store;

pub use ingestion::ChannelEnrichmentSink;
pub use ops::{recover, verify, RecoverReport, VerifyReport};
pub use ranker::RankedMatch;
pub use store::RecordStore;
