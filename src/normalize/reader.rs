//! Read raw records from a JSON document or an NDJSON stream

use crate::error::kind_of;
use crate::normalize::types::Record;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::io::Read;

/// Read every raw record from `reader`.
///
/// The whole input is parsed at once with simd-json: a top-level array
/// yields its elements, a single object yields itself. Input that is not one
/// JSON document is parsed as newline-delimited JSON instead.
pub fn read_records<R: Read>(mut reader: R) -> Result<Vec<Record>> {
    let mut content = Vec::new();
    reader
        .read_to_end(&mut content)
        .context("Failed to read input")?;

    // simd_json parses in place, so keep the original bytes for the fallback.
    // Deserializing straight into serde_json keeps field order.
    let mut scratch = content.clone();
    let values = match simd_json::serde::from_slice::<Value>(&mut scratch) {
        Ok(Value::Array(items)) => items,
        Ok(value) => vec![value],
        Err(_) => parse_ndjson(&content)?,
    };

    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Value::Object(record) => Ok(record),
            other => bail!("Record {} is a JSON {}, expected an object", idx, kind_of(&other)),
        })
        .collect()
}

fn parse_ndjson(content: &[u8]) -> Result<Vec<Value>> {
    let text = String::from_utf8_lossy(content);
    let mut values = Vec::new();

    for (line_number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse JSON on line {}", line_number + 1))?;
        values.push(value);
    }

    Ok(values)
}
