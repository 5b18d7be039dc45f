use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// A schema-less record: one row of one entity kind, or a raw API object
pub type Record = Map<String, Value>;

/// Field holding the surrogate key
pub const WFP_ID: &str = "wfp_id";

/// Field holding the upstream (natural) key
pub const NATURAL_ID: &str = "id";

/// Field used to pick a winner when two records share an identity
pub const MODIFIED_DATE: &str = "modified_date";

/// A surrogate key, generated for every record we place in a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WfpId(pub String);

impl WfpId {
    pub fn new(id: impl Into<String>) -> Self {
        WfpId(id.into())
    }

    /// A fresh random (v4) identifier
    pub fn generate() -> Self {
        WfpId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WfpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Return a copy of `record` carrying a freshly generated `wfp_id`.
///
/// The upstream API does not always send an `id`, so every object gets its
/// own surrogate in a separate field instead of a fabricated `id`.
pub fn with_wfp_id(record: &Record) -> Record {
    let mut copy = record.clone();
    copy.insert(
        WFP_ID.to_string(),
        Value::String(WfpId::generate().0),
    );
    copy
}

/// The record's surrogate key, if it has a textual one
pub fn wfp_id_of(record: &Record) -> Option<WfpId> {
    record
        .get(WFP_ID)
        .and_then(Value::as_str)
        .map(WfpId::new)
}

/// The record's modification timestamp; anything but a JSON number is absent
pub fn modified_date_of(record: &Record) -> Option<f64> {
    record.get(MODIFIED_DATE).and_then(Value::as_f64)
}

/// The key a record is stored under inside a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Canonical JSON text of a non-null `id`, so `1391` and `"1391"` differ
    Natural(String),
    Surrogate(WfpId),
}

impl Identity {
    /// Natural key when present and non-null, otherwise the surrogate key
    pub fn of(record: &Record) -> Option<Identity> {
        match record.get(NATURAL_ID) {
            Some(Value::Null) | None => wfp_id_of(record).map(Identity::Surrogate),
            Some(id) => Some(Identity::Natural(id.to_string())),
        }
    }
}
