//! Collapse nested objects into single-level records
//!
//! Objects returned by the API embed objects we never normalize into their own
//! tables (an event's `location`, its `contact`). Their fields are hoisted
//! into the containing record under prefixed names instead:
//!
//! ```text
//! {"title": "a night with elvis", "location": {"venue": "hollywood bowl"}}
//!   => {"title": "a night with elvis", "location_venue": "hollywood bowl"}
//! ```

use crate::error::NormalizeError;
use crate::normalize::types::Record;
use serde_json::Value;

/// Separator between a prefix and a field name
pub const KEY_SEPARATOR: &str = "_";

/// Separator used when joining list elements into one field
pub const LIST_SEPARATOR: &str = ", ";

/// Flatten `record`, prefixing every produced key with `prefix` (if non-empty).
///
/// Nested objects are flattened recursively; lists become a single text field
/// (or null when nothing survives); everything else is copied through.
/// Distinct sub-trees must not compose to the same key: the later one wins.
pub fn flatten(record: &Record, prefix: &str) -> Record {
    let mut flat = Record::new();

    for (key, value) in record {
        let key_to_add = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", prefix, KEY_SEPARATOR, key)
        };

        match value {
            Value::Object(nested) => {
                for (nested_key, nested_value) in flatten(nested, &key_to_add) {
                    flat.insert(nested_key, nested_value);
                }
            }
            Value::Array(items) => {
                flat.insert(key_to_add, join_list(items));
            }
            _ => {
                flat.insert(key_to_add, value.clone());
            }
        }
    }

    flat
}

/// Join the truthy elements of a list with `", "`.
///
/// Falsy elements (null, false, 0, "", [], {}) are dropped, zero included.
/// Strings contribute their text, anything else its JSON rendering.
fn join_list(items: &[Value]) -> Value {
    let parts: Vec<String> = items
        .iter()
        .filter(|item| is_truthy(item))
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    if parts.is_empty() {
        Value::Null
    } else {
        Value::String(parts.join(LIST_SEPARATOR))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Multi-valued contact lists on a person, with the field kept from the first entry
const PERSON_CONTACT_FIELDS: [(&str, &str, &str); 3] = [
    ("phone_numbers", "number", "phone_number"),
    ("email_addresses", "address", "email_address"),
    ("postal_addresses", "postal_code", "postal_code"),
];

/// Flatten a person, keeping only the first phone number, email address and
/// postal code.
///
/// Each list is replaced by a single field taken from its first element; an
/// empty, null or missing list adds nothing. The lists themselves are always
/// removed before the generic [`flatten`] runs.
pub fn flatten_person(person: &Record, prefix: &str) -> Result<Record, NormalizeError> {
    let mut person = person.clone();

    for (list_field, item_field, target_field) in PERSON_CONTACT_FIELDS {
        let first = match person.shift_remove(list_field) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => items.into_iter().next(),
            Some(other) => {
                return Err(NormalizeError::malformed(list_field, "array", &other));
            }
        };

        match first {
            None => {}
            Some(Value::Object(item)) => {
                let value = item.get(item_field).cloned().unwrap_or(Value::Null);
                person.insert(target_field.to_string(), value);
            }
            Some(other) => {
                return Err(NormalizeError::malformed(
                    format!("{}[0]", list_field),
                    "object",
                    &other,
                ));
            }
        }
    }

    Ok(flatten(&person, prefix))
}
