use serde_json::Value;

/// Pretty-print JSON to stdout; serialization failures go to stderr.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => tracing::error!(error = %e, "failed to serialize output"),
    }
}
