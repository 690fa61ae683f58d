pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Keys that hold a per-period series, in the order they are looked up.
const SERIES_KEYS: [&str; 4] = ["entries", "years", "points", "rows"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` object of an envelope, or the value itself for summaries.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// First per-period series in a result, searching one level of nesting
/// (auto loan and credit card results keep theirs under `schedule`).
pub(crate) fn find_series(result: &Value) -> Option<&Vec<Value>> {
    let map = result.as_object()?;
    for key in SERIES_KEYS {
        if let Some(Value::Array(rows)) = map.get(key) {
            return Some(rows);
        }
    }
    map.values()
        .filter(|v| v.is_object())
        .find_map(|nested| find_series(nested))
}
