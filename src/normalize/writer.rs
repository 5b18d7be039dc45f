use crate::normalize::types::Record;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination for finished collections
pub trait CollectionSink {
    /// Write every record of the collection called `name`
    fn write_collection(&mut self, name: &str, records: &[Record]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Every field name used by any record, sorted.
///
/// Records are sparse, so fixed-column outputs need the union.
pub fn field_names<'r, I>(records: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'r Record>,
{
    records
        .into_iter()
        .flat_map(|record| record.keys().cloned())
        .collect()
}

/// Render a flat value as a CSV cell: null is empty, strings are raw text,
/// everything else is its JSON text
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Writes each collection to `<name>.csv` in an output directory
pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    /// Create the sink, creating `output_dir` if needed
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory {}", output_dir.as_ref().display()))?;

        Ok(CsvSink {
            output_dir: output_dir.as_ref().to_path_buf(),
        })
    }

    /// Path written for `name`; `.csv` is appended unless already present
    pub fn path_for(&self, name: &str) -> PathBuf {
        if name.ends_with(".csv") {
            self.output_dir.join(name)
        } else {
            self.output_dir.join(format!("{}.csv", name))
        }
    }
}

impl CollectionSink for CsvSink {
    fn write_collection(&mut self, name: &str, records: &[Record]) -> Result<()> {
        let path = self.path_for(name);
        let columns: Vec<String> = field_names(records).into_iter().collect();

        // csv would quote an empty header record as `""`
        if columns.is_empty() {
            std::fs::write(&path, "\n")
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            return Ok(());
        }

        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        writer
            .write_record(&columns)
            .context("Failed to write CSV header")?;

        for record in records {
            let row = columns.iter().map(|column| cell(record.get(column)));
            writer.write_record(row).context("Failed to write CSV row")?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        Ok(())
    }
}

/// Writes each collection to `<name>.jsonl`, one JSON object per line
pub struct JsonlSink {
    output_dir: PathBuf,
    writers: HashMap<String, BufWriter<File>>,
}

impl JsonlSink {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create output directory")?;

        Ok(JsonlSink {
            output_dir: output_dir.as_ref().to_path_buf(),
            writers: HashMap::new(),
        })
    }
}

impl CollectionSink for JsonlSink {
    fn write_collection(&mut self, name: &str, records: &[Record]) -> Result<()> {
        let writer = match self.writers.entry(name.to_string()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let filename = self.output_dir.join(format!("{}.jsonl", name));
                let file = File::create(&filename)
                    .with_context(|| format!("Failed to open file: {}", filename.display()))?;
                entry.insert(BufWriter::new(file))
            }
        };

        for record in records {
            let json = serde_json::to_string(record)
                .context("Failed to serialize record")?;
            writeln!(writer, "{}", json)
                .context("Failed to write record")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush().context("Failed to flush writer")?;
        }
        Ok(())
    }
}
