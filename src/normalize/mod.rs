//! Attendance normalization - split nested records into relational collections
//!
//! Raw attendances embed their event, timeslot, person and sponsoring
//! organization (and events embed their own sponsor). Normalization pulls
//! each embedded object into a deduplicated [`Collection`] of flat records
//! and leaves a `<key>_wfp_id` reference behind, so every collection can be
//! written to its own CSV file.
//!
//! Normalization is batch-only: the whole input is held in memory and the
//! collections are written once at the end.

pub mod types;
pub mod flatten;
pub mod collection;
pub mod normalizer;
pub mod batch;
pub mod reader;
pub mod writer;

pub use types::{with_wfp_id, Identity, Record, WfpId, WFP_ID};
pub use flatten::{flatten, flatten_person};
pub use collection::Collection;
pub use normalizer::{normalize, Targets};
pub use batch::{BatchSummary, NormalizedBatch};
pub use reader::read_records;
pub use writer::{field_names, CollectionSink, CsvSink, JsonlSink};
