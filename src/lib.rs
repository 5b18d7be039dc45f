//! # mobilize-melt - Mobilize attendance ingest and normalization
//!
//! Tools for turning Mobilize attendances (deeply nested JSON) into
//! relational data.
//!
//! ## Modules
//!
//! - **normalize**: split raw attendances into deduplicated collections of
//!   attendances, events, people, organizations, timeslots and custom signup
//!   field values, and write them out as CSV or JSON Lines
//! - **ingest**: incremental, highwater-mark sync of attendances from the
//!   Mobilize API into a warehouse table
//!
//! ## Quick Start
//!
//! ```rust
//! use mobilize_melt::normalize::{NormalizedBatch, Record, WFP_ID};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let attendance: Record = serde_json::from_value(json!({
//!     "id": 961149,
//!     "status": "REGISTERED",
//!     "sponsor": {"id": 1391, "name": "Working Families Party"},
//!     "event": {
//!         "id": 91154,
//!         "title": "Text Out the Vote Texas!",
//!         "sponsor": {"id": 1392, "name": "Fake Working Families Party"}
//!     }
//! }))?;
//!
//! let mut batch = NormalizedBatch::new();
//! batch.push(&attendance)?;
//!
//! // both sponsors became organizations; the event points at its own
//! assert_eq!(batch.organizations.len(), 2);
//! let event = &batch.events.records()[0];
//! assert!(event.contains_key("sponsor_wfp_id"));
//! assert!(event.contains_key(WFP_ID));
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::io::Read;

pub mod error;
pub mod ingest;
pub mod normalize;

// Re-export commonly used types for convenience
pub use error::{IngestError, NormalizeError};
pub use normalize::{
    flatten, flatten_person, normalize, Collection, CollectionSink, CsvSink, JsonlSink,
    NormalizedBatch, Record, Targets,
};
pub use ingest::{load_data, IngestConfig, IngestSummary};

/// Main entry point: normalize every attendance read from `reader` and write
/// the resulting collections to `sink`
pub fn normalize_attendances<R: Read, S: CollectionSink>(reader: R, sink: &mut S) -> Result<NormalizedBatch> {
    let attendances = normalize::read_records(reader)?;

    let mut batch = NormalizedBatch::new();
    batch.extend(&attendances).map_err(|(idx, err)| {
        anyhow::Error::new(err).context(format!("Failed to normalize attendance {}", idx))
    })?;

    batch.write_to(sink)?;
    Ok(batch)
}
