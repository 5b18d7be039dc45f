use crate::error::NormalizeError;
use crate::normalize::collection::Collection;
use crate::normalize::flatten::flatten;
use crate::normalize::normalizer::{normalize, Targets};
use crate::normalize::types::{with_wfp_id, Record};
use crate::normalize::writer::CollectionSink;
use anyhow::Result;
use serde::Serialize;
use tracing::info;

/// Output names, in the order collections are handed to a sink
pub const ATTENDANCES: &str = "attendances";
pub const TIMESLOTS: &str = "timeslots";
pub const EVENTS: &str = "events";
pub const PEOPLE: &str = "people";
pub const ORGANIZATIONS: &str = "organizations";
pub const CUSTOM_SIGNUP_FIELDS: &str = "custom_signup_fields";

/// Every collection produced by normalizing a batch of raw attendances
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub attendances: Collection,
    pub organizations: Collection,
    pub timeslots: Collection,
    pub events: Collection,
    pub people: Collection,
    /// Not deduplicated; one entry per value on each attendance
    pub custom_signup_field_values: Vec<Record>,
}

/// Record counts per collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub attendances: usize,
    pub organizations: usize,
    pub timeslots: usize,
    pub events: usize,
    pub people: usize,
    pub custom_signup_field_values: usize,
}

impl NormalizedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one raw attendance and upsert it into `attendances`.
    ///
    /// The attendance gets its own `wfp_id` first so custom signup field
    /// values can refer back to it. Its remaining nested objects (such as
    /// `referrer`) are flattened so every collection holds flat records.
    pub fn push(&mut self, attendance: &Record) -> Result<(), NormalizeError> {
        let attendance = with_wfp_id(attendance);

        let mut targets = Targets {
            organizations: &mut self.organizations,
            timeslots: Some(&mut self.timeslots),
            events: Some(&mut self.events),
            people: Some(&mut self.people),
            custom_signup_field_values: Some(&mut self.custom_signup_field_values),
        };
        let normalized = normalize(&attendance, &mut targets)?;

        self.attendances.upsert(flatten(&normalized, ""))?;
        Ok(())
    }

    /// Push every attendance in order, stopping at the first malformed one.
    ///
    /// The error carries the index of the offending record.
    pub fn extend<'r, I>(&mut self, attendances: I) -> Result<(), (usize, NormalizeError)>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        for (idx, attendance) in attendances.into_iter().enumerate() {
            self.push(attendance).map_err(|err| (idx, err))?;
        }
        Ok(())
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            attendances: self.attendances.len(),
            organizations: self.organizations.len(),
            timeslots: self.timeslots.len(),
            events: self.events.len(),
            people: self.people.len(),
            custom_signup_field_values: self.custom_signup_field_values.len(),
        }
    }

    /// Hand every collection to `sink`
    pub fn write_to<S: CollectionSink>(&self, sink: &mut S) -> Result<()> {
        sink.write_collection(ATTENDANCES, self.attendances.records())?;
        sink.write_collection(TIMESLOTS, self.timeslots.records())?;
        sink.write_collection(EVENTS, self.events.records())?;
        sink.write_collection(PEOPLE, self.people.records())?;
        sink.write_collection(ORGANIZATIONS, self.organizations.records())?;
        sink.write_collection(CUSTOM_SIGNUP_FIELDS, &self.custom_signup_field_values)?;
        sink.flush()?;

        info!(summary = ?self.summary(), "wrote normalized collections");
        Ok(())
    }
}
