//! Warehouse columns projected from a raw attendance
//!
//! The attendances table keeps a fixed subset of each attendance: its own
//! dates and status plus a few fields of the embedded event, person and
//! timeslot.

use crate::normalize::types::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Warehouse column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "INT64")]
    Int64,
    #[serde(rename = "STRING")]
    String,
    #[serde(rename = "BOOL")]
    Bool,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "INT64",
            ColumnType::String => "STRING",
            ColumnType::Bool => "BOOL",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Where a column's value lives in the raw attendance
#[derive(Debug, Clone, Copy)]
pub enum ColumnSource {
    /// Follow object keys from the attendance root
    Path(&'static [&'static str]),
    /// `person.<list>[0].<field>`: the first of a person's contact entries
    PersonContact {
        list: &'static str,
        field: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub source: ColumnSource,
}

impl Column {
    const fn path(name: &'static str, column_type: ColumnType, path: &'static [&'static str]) -> Self {
        Column {
            name,
            column_type,
            source: ColumnSource::Path(path),
        }
    }

    const fn person_contact(name: &'static str, list: &'static str, field: &'static str) -> Self {
        Column {
            name,
            column_type: ColumnType::String,
            source: ColumnSource::PersonContact { list, field },
        }
    }

    /// The column's value for `attendance`; null when anything along the way
    /// is missing, null, or not an object
    pub fn extract(&self, attendance: &Record) -> Value {
        let value = match self.source {
            ColumnSource::Path(path) => lookup(attendance, path),
            ColumnSource::PersonContact { list, field } => attendance
                .get("person")
                .and_then(|person| person.get(list))
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(|item| item.get(field)),
        };
        value.cloned().unwrap_or(Value::Null)
    }
}

fn lookup<'r>(record: &'r Record, path: &[&str]) -> Option<&'r Value> {
    let (first, rest) = path.split_first()?;
    let mut value = record.get(*first)?;
    for key in rest {
        value = value.as_object()?.get(*key)?;
    }
    Some(value)
}

/// Columns of the attendances table, in table order
pub static ATTENDANCE_COLUMNS: [Column; 19] = [
    Column::path("id", ColumnType::Int64, &["id"]),
    Column::path("created_date", ColumnType::Int64, &["created_date"]),
    Column::path("modified_date", ColumnType::Int64, &["modified_date"]),
    Column::path("event_id", ColumnType::Int64, &["event", "id"]),
    Column::path("event_title", ColumnType::String, &["event", "title"]),
    // events carry their type under `event_type`; there is no `type` field
    Column::path("event_type", ColumnType::String, &["event", "event_type"]),
    Column::path("event_summary", ColumnType::String, &["event", "summary"]),
    Column::path("event_description", ColumnType::String, &["event", "description"]),
    Column::path("person_id", ColumnType::Int64, &["person", "id"]),
    Column::path("person_given_name", ColumnType::String, &["person", "given_name"]),
    Column::path("person_family_name", ColumnType::String, &["person", "family_name"]),
    Column::person_contact("person_email_address", "email_addresses", "address"),
    Column::person_contact("person_phone_number", "phone_numbers", "number"),
    Column::person_contact("person_postal_code", "postal_addresses", "postal_code"),
    Column::path("person_sms_opt_in_status", ColumnType::String, &["person", "sms_opt_in_status"]),
    Column::path("start_date", ColumnType::Int64, &["timeslot", "start_date"]),
    Column::path("end_date", ColumnType::Int64, &["timeslot", "end_date"]),
    Column::path("status", ColumnType::String, &["status"]),
    Column::path("attended", ColumnType::Bool, &["attended"]),
];

/// One value per column of [`ATTENDANCE_COLUMNS`]
pub fn project(attendance: &Record) -> Vec<(ColumnType, Value)> {
    ATTENDANCE_COLUMNS
        .iter()
        .map(|column| (column.column_type, column.extract(attendance)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn column(name: &str) -> &'static Column {
        ATTENDANCE_COLUMNS.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn test_column_names_are_unique() {
        let mut names: Vec<&str> = ATTENDANCE_COLUMNS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ATTENDANCE_COLUMNS.len());
    }

    #[test]
    fn test_projection_of_nested_fields() {
        let attendance = record(json!({
            "id": 961149,
            "attended": true,
            "event": {"id": 91154, "title": "Text Out the Vote Texas!"},
            "timeslot": {"start_date": 1556028000, "end_date": 1556071200},
            "person": {
                "id": 467354,
                "email_addresses": [{"address": "a@example.com"}, {"address": "b@example.com"}],
                "phone_numbers": []
            }
        }));

        assert_eq!(column("id").extract(&attendance), json!(961149));
        assert_eq!(column("event_title").extract(&attendance), json!("Text Out the Vote Texas!"));
        assert_eq!(column("end_date").extract(&attendance), json!(1556071200));
        assert_eq!(column("person_email_address").extract(&attendance), json!("a@example.com"));
        assert_eq!(column("person_phone_number").extract(&attendance), Value::Null);
        assert_eq!(column("attended").extract(&attendance), json!(true));
    }

    #[test]
    fn test_event_type_reads_event_type_field() {
        let attendance = record(json!({
            "event": {"event_type": "PHONE_BANK", "type": "ignored"}
        }));

        assert_eq!(column("event_type").extract(&attendance), json!("PHONE_BANK"));
    }

    #[test]
    fn test_missing_or_null_parents_project_null() {
        let attendance = record(json!({"id": 1, "event": null}));

        assert_eq!(column("event_id").extract(&attendance), Value::Null);
        assert_eq!(column("person_postal_code").extract(&attendance), Value::Null);
        assert_eq!(column("status").extract(&attendance), Value::Null);
    }

    #[test]
    fn test_project_follows_column_order() {
        let row = project(&record(json!({"id": 1, "status": "REGISTERED"})));

        assert_eq!(row.len(), 19);
        assert_eq!(row[0], (ColumnType::Int64, json!(1)));
        assert_eq!(row[17], (ColumnType::String, json!("REGISTERED")));
    }
}
