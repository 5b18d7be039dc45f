use crate::error::NormalizeError;
use crate::normalize::types::{modified_date_of, wfp_id_of, Identity, Record};
use std::collections::HashMap;
use tracing::debug;

/// A deduplicated set of flat records of one entity kind, keyed by identity.
///
/// Records are kept in first-insertion order so exports are reproducible;
/// a replacement keeps the slot of the record it replaces.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    index: HashMap<Identity, usize>,
    records: Vec<Record>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record`, or replace the resident record with the same identity
    /// when `record` was modified more recently.
    ///
    /// The incoming record wins only if it has a `modified_date` and the
    /// resident one either has none or an older one. Returns the record now
    /// resident under that identity, which is not necessarily `record`.
    ///
    /// Two records without a natural `id` never match each other, since their
    /// surrogate keys are generated independently.
    pub fn upsert(&mut self, record: Record) -> Result<&Record, NormalizeError> {
        if wfp_id_of(&record).is_none() {
            return Err(NormalizeError::MissingSurrogateKey(
                "records must carry a wfp_id before they enter a collection".to_string(),
            ));
        }
        let identity = Identity::of(&record).ok_or_else(|| {
            NormalizeError::MissingSurrogateKey("record has neither id nor wfp_id".to_string())
        })?;

        let existing = self.index.get(&identity).copied();
        let slot = match existing {
            None => {
                self.records.push(record);
                let slot = self.records.len() - 1;
                self.index.insert(identity, slot);
                slot
            }
            Some(slot) => {
                let incoming = modified_date_of(&record);
                let resident = modified_date_of(&self.records[slot]);
                let newer = match (incoming, resident) {
                    (Some(_), None) => true,
                    (Some(incoming), Some(resident)) => incoming > resident,
                    (None, _) => false,
                };

                if newer {
                    debug!(?identity, "replacing record with a more recently modified one");
                    self.records[slot] = record;
                } else {
                    debug!(?identity, "keeping resident record");
                }
                slot
            }
        };

        Ok(&self.records[slot])
    }

    pub fn get(&self, identity: &Identity) -> Option<&Record> {
        self.index.get(identity).map(|&slot| &self.records[slot])
    }

    /// Look up a record by its natural `id` value
    pub fn get_by_id(&self, id: &serde_json::Value) -> Option<&Record> {
        self.get(&Identity::Natural(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
