//! Persisting pages of attendances
//!
//! Each page is loaded into a temporary table and merged into the
//! attendances table on `id`, so re-fetched attendances update in place.

use crate::error::IngestError;
use crate::ingest::columns::{project, ColumnType, ATTENDANCE_COLUMNS};
use crate::normalize::types::Record;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

/// Name of the per-page temporary table
pub const TEMP_TABLE: &str = "temp_attendances";

/// A positional query parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParameter {
    #[serde(rename = "type")]
    pub parameter_type: ColumnType,
    pub value: Value,
}

/// The statements and parameters that persist one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavePage {
    pub sql: String,
    pub parameters: Vec<QueryParameter>,
}

impl SavePage {
    /// Build the statements for `rows`; `None` for an empty page
    pub fn build(table: &str, rows: &[Record]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        Some(SavePage {
            sql: save_page_sql(table, rows.len()),
            parameters: save_page_parameters(rows),
        })
    }
}

/// Query for the highwater mark: the newest `modified_date` already stored
pub fn max_modified_date_sql(table: &str) -> String {
    format!(
        "SELECT MAX(modified_date) AS max_modified_timestamp FROM `{}`",
        table
    )
}

/// Create the temporary table, insert `row_count` placeholder rows into it and
/// merge it into `table`
pub fn save_page_sql(table: &str, row_count: usize) -> String {
    let column_definitions = ATTENDANCE_COLUMNS
        .iter()
        .map(|column| format!("    {} {}", column.name, column.column_type))
        .collect::<Vec<_>>()
        .join(",\n");

    let placeholders = vec!["?"; ATTENDANCE_COLUMNS.len()].join(", ");
    let values = vec![format!("({})", placeholders); row_count].join(",\n");

    let update = ATTENDANCE_COLUMNS
        .iter()
        .map(|column| format!("    {} = T.{}", column.name, column.name))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "CREATE TEMPORARY TABLE {temp}\n(\n{columns}\n);\n\
         INSERT {temp} VALUES\n{values};\n\
         MERGE `{table}` AS A\n\
         USING {temp} AS T\n\
         ON A.id = T.id\n\
         WHEN NOT MATCHED THEN\n    INSERT ROW\n\
         WHEN MATCHED THEN\n    UPDATE SET\n{update};\n",
        temp = TEMP_TABLE,
        columns = column_definitions,
        values = values,
        table = table,
        update = update,
    )
}

/// Positional parameters for [`save_page_sql`]: every column of every row
pub fn save_page_parameters(rows: &[Record]) -> Vec<QueryParameter> {
    rows.iter()
        .flat_map(project)
        .map(|(parameter_type, value)| QueryParameter {
            parameter_type,
            value,
        })
        .collect()
}

/// Where pages of attendances are persisted
pub trait Warehouse {
    /// Newest `modified_date` already stored; 0 when nothing is stored yet
    fn max_modified_date(&mut self) -> Result<i64, IngestError>;

    fn save_page(&mut self, page: &SavePage) -> Result<(), IngestError>;
}

/// Writes every page as one JSON line (`{"sql": .., "parameters": [..]}`)
/// for a downstream loader to execute
pub struct ScriptWarehouse<W: Write> {
    writer: W,
    highwater: i64,
}

impl<W: Write> ScriptWarehouse<W> {
    /// `highwater` is reported as the stored maximum `modified_date`
    pub fn new(writer: W, highwater: i64) -> Self {
        ScriptWarehouse { writer, highwater }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Warehouse for ScriptWarehouse<W> {
    fn max_modified_date(&mut self) -> Result<i64, IngestError> {
        Ok(self.highwater)
    }

    fn save_page(&mut self, page: &SavePage) -> Result<(), IngestError> {
        let line = serde_json::to_string(page)
            .map_err(|err| IngestError::Warehouse(err.to_string()))?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_save_page_sql_shape() {
        let sql = save_page_sql("project.mobilize.attendances", 2);

        assert!(sql.starts_with("CREATE TEMPORARY TABLE temp_attendances\n(\n    id INT64,\n"));
        assert!(sql.contains("    attended BOOL\n);"));
        assert_eq!(sql.matches('?').count(), 2 * ATTENDANCE_COLUMNS.len());
        assert_eq!(sql.matches("),\n(").count(), 1);
        assert!(sql.contains("MERGE `project.mobilize.attendances` AS A"));
        assert!(sql.contains("ON A.id = T.id"));
        assert!(sql.contains("    status = T.status,\n"));
        assert!(sql.trim_end().ends_with("attended = T.attended;"));
    }

    #[test]
    fn test_parameters_are_row_major() {
        let rows = vec![
            record(json!({"id": 1, "attended": true})),
            record(json!({"id": 2, "attended": false})),
        ];

        let parameters = save_page_parameters(&rows);

        assert_eq!(parameters.len(), 2 * ATTENDANCE_COLUMNS.len());
        assert_eq!(parameters[0].value, json!(1));
        assert_eq!(parameters[ATTENDANCE_COLUMNS.len()].value, json!(2));
        assert_eq!(
            parameters[2 * ATTENDANCE_COLUMNS.len() - 1],
            QueryParameter {
                parameter_type: ColumnType::Bool,
                value: json!(false)
            }
        );
    }

    #[test]
    fn test_empty_page_has_no_statement() {
        assert!(SavePage::build("t", &[]).is_none());
    }

    #[test]
    fn test_max_modified_date_sql() {
        assert_eq!(
            max_modified_date_sql("p.d.t"),
            "SELECT MAX(modified_date) AS max_modified_timestamp FROM `p.d.t`"
        );
    }

    #[test]
    fn test_script_warehouse_writes_one_line_per_page() {
        let mut warehouse = ScriptWarehouse::new(Vec::new(), 42);
        let page = SavePage::build("t", &[record(json!({"id": 1}))]).unwrap();

        assert_eq!(warehouse.max_modified_date().unwrap(), 42);
        warehouse.save_page(&page).unwrap();
        warehouse.save_page(&page).unwrap();

        let output = String::from_utf8(warehouse.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["parameters"][0], json!({"type": "INT64", "value": 1}));
        assert!(parsed["sql"].as_str().unwrap().contains("MERGE `t`"));
    }
}
