//! Extract embedded objects into their own collections
//!
//! An attendance embeds its sponsor (an organization), its timeslot, its
//! event and its person; an event embeds its own sponsor. Each embedded object
//! is given a `wfp_id`, flattened, upserted into the matching collection and
//! replaced in the containing record by a `<key>_wfp_id` reference to the
//! record that ends up resident in that collection.

use crate::error::NormalizeError;
use crate::normalize::collection::Collection;
use crate::normalize::flatten::{flatten, flatten_person};
use crate::normalize::types::{wfp_id_of, with_wfp_id, Record, WfpId, WFP_ID};
use serde_json::Value;
use tracing::trace;

pub const SPONSOR: &str = "sponsor";
pub const TIMESLOT: &str = "timeslot";
pub const EVENT: &str = "event";
pub const PERSON: &str = "person";
pub const CUSTOM_SIGNUP_FIELD_VALUES: &str = "custom_signup_field_values";

/// Back-reference stamped on every custom signup field value
pub const ATTENDANCE_WFP_ID: &str = "attendance_wfp_id";

type Flattener = fn(&Record, &str) -> Result<Record, NormalizeError>;

fn flatten_plain(record: &Record, prefix: &str) -> Result<Record, NormalizeError> {
    Ok(flatten(record, prefix))
}

/// The collections a containing record is normalized into.
///
/// Organizations are always collected. The other targets are optional: an
/// event is normalized with organizations only, since it carries a sponsor
/// but no timeslot, person, nested event or custom fields.
pub struct Targets<'a> {
    pub organizations: &'a mut Collection,
    pub timeslots: Option<&'a mut Collection>,
    pub events: Option<&'a mut Collection>,
    pub people: Option<&'a mut Collection>,
    pub custom_signup_field_values: Option<&'a mut Vec<Record>>,
}

impl<'a> Targets<'a> {
    pub fn organizations_only(organizations: &'a mut Collection) -> Self {
        Targets {
            organizations,
            timeslots: None,
            events: None,
            people: None,
            custom_signup_field_values: None,
        }
    }
}

/// Normalize every embedded object of `record` into `targets`.
///
/// Steps run in a fixed order: sponsor, timeslot, event (after normalizing
/// the event's own sponsor), person, custom signup field values. A null or
/// empty embedded object is left in place untouched; any other non-object
/// value under one of those keys is a [`NormalizeError::MalformedShape`].
///
/// Returns a new record; `record` itself is not modified. Records that were
/// already normalized pass through unchanged.
pub fn normalize(record: &Record, targets: &mut Targets<'_>) -> Result<Record, NormalizeError> {
    let mut normalized = record.clone();

    if let Some(wfp_id) = store_embedded(&normalized, SPONSOR, targets.organizations, flatten_plain)? {
        replace_with_wfp_id(&mut normalized, SPONSOR, wfp_id);
    }

    if let Some(timeslots) = targets.timeslots.as_deref_mut() {
        if let Some(wfp_id) = store_embedded(&normalized, TIMESLOT, timeslots, flatten_plain)? {
            replace_with_wfp_id(&mut normalized, TIMESLOT, wfp_id);
        }
    }

    if let Some(events) = targets.events.as_deref_mut() {
        let event = match embedded(&normalized, EVENT)? {
            Some(event) => {
                let mut event_targets = Targets::organizations_only(&mut *targets.organizations);
                Some(normalize(event, &mut event_targets)?)
            }
            None => None,
        };

        if let Some(event) = event {
            let wfp_id = store(&event, events, flatten_plain)?;
            replace_with_wfp_id(&mut normalized, EVENT, wfp_id);
        }
    }

    if let Some(people) = targets.people.as_deref_mut() {
        if let Some(wfp_id) = store_embedded(&normalized, PERSON, people, flatten_person)? {
            replace_with_wfp_id(&mut normalized, PERSON, wfp_id);
        }
    }

    if let Some(values) = targets.custom_signup_field_values.as_deref_mut() {
        let field_values = match normalized.shift_remove(CUSTOM_SIGNUP_FIELD_VALUES) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(NormalizeError::malformed(
                    CUSTOM_SIGNUP_FIELD_VALUES,
                    "array",
                    &other,
                ));
            }
        };
        values.extend(stamp_custom_field_values(&normalized, field_values)?);
    }

    Ok(normalized)
}

/// The object embedded under `key`, or `None` when there is nothing to normalize
fn embedded<'r>(record: &'r Record, key: &str) -> Result<Option<&'r Record>, NormalizeError> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(object)) if object.is_empty() => Ok(None),
        Some(Value::Object(object)) => Ok(Some(object)),
        Some(other) => Err(NormalizeError::malformed(key, "object", other)),
    }
}

fn store_embedded(
    containing: &Record,
    key: &str,
    collection: &mut Collection,
    flattener: Flattener,
) -> Result<Option<WfpId>, NormalizeError> {
    match embedded(containing, key)? {
        Some(contained) => store(contained, collection, flattener).map(Some),
        None => Ok(None),
    }
}

/// Give `contained` a surrogate key, flatten it and upsert it; returns the
/// surrogate key of the record left resident in `collection`
fn store(
    contained: &Record,
    collection: &mut Collection,
    flattener: Flattener,
) -> Result<WfpId, NormalizeError> {
    let flat = flattener(&with_wfp_id(contained), "")?;
    let resident = collection.upsert(flat)?;
    let wfp_id = wfp_id_of(resident).ok_or_else(|| {
        NormalizeError::MissingSurrogateKey("resident collection record".to_string())
    })?;

    trace!(%wfp_id, "stored embedded record");
    Ok(wfp_id)
}

fn replace_with_wfp_id(containing: &mut Record, key: &str, wfp_id: WfpId) {
    containing.shift_remove(key);
    containing.insert(format!("{}_{}", key, WFP_ID), Value::String(wfp_id.0));
}

fn stamp_custom_field_values(
    containing: &Record,
    field_values: Vec<Value>,
) -> Result<Vec<Record>, NormalizeError> {
    if field_values.is_empty() {
        return Ok(Vec::new());
    }

    let attendance_wfp_id = wfp_id_of(containing).ok_or_else(|| {
        NormalizeError::MissingSurrogateKey(
            "custom signup field values need the attendance's wfp_id".to_string(),
        )
    })?;

    field_values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Value::Object(fields) => {
                let mut stamped = Record::new();
                stamped.insert(
                    ATTENDANCE_WFP_ID.to_string(),
                    Value::String(attendance_wfp_id.0.clone()),
                );
                for (key, field) in fields {
                    if key != ATTENDANCE_WFP_ID {
                        stamped.insert(key, field);
                    }
                }
                Ok(stamped)
            }
            other => Err(NormalizeError::malformed(
                format!("{}[{}]", CUSTOM_SIGNUP_FIELD_VALUES, idx),
                "object",
                &other,
            )),
        })
        .collect()
}
