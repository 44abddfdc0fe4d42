//! # CSV conversion
//!
//! Turns a tabular export into the JSON record array the grouper consumes.
//! Only two columns get special treatment: `id` becomes a JSON number when it
//! is a plain integer, and `relations` is decoded from its JSON text. Every
//! other non-empty cell is carried through as a string.

use std::io::Read;

use serde_json::{Map, Number, Value};
use tracing::warn;

const ID_COLUMN: &str = "id";
const RELATIONS_COLUMN: &str = "relations";

/// Counters from one conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    /// Data rows read.
    pub rows: usize,
    /// Rows whose `relations` cell was not valid JSON (kept as raw text).
    pub malformed_relations: usize,
}

/// Converts CSV from `reader` into record objects.
///
/// # Errors
///
/// Returns the underlying `csv::Error` if the header or a row cannot be read.
pub fn csv_to_records<R: Read>(reader: R) -> csv::Result<(Vec<Value>, ConvertSummary)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    let mut summary = ConvertSummary::default();

    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let mut object = Map::new();

        for (column, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() || column.is_empty() {
                continue;
            }
            let value = match column {
                ID_COLUMN => id_value(cell),
                RELATIONS_COLUMN => match serde_json::from_str::<Value>(cell) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(row = line + 1, "relations cell is not valid JSON: {e}");
                        summary.malformed_relations += 1;
                        Value::String(cell.to_string())
                    }
                },
                _ => Value::String(cell.to_string()),
            };
            object.insert(column.to_string(), value);
        }

        records.push(Value::Object(object));
        summary.rows += 1;
    }

    Ok((records, summary))
}

fn id_value(cell: &str) -> Value {
    match cell.parse::<u64>() {
        Ok(n) if cell.bytes().all(|b| b.is_ascii_digit()) => Value::Number(Number::from(n)),
        _ => Value::String(cell.to_string()),
    }
}
