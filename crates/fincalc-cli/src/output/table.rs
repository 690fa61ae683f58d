use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables: scalar fields first, then one table per series.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_section(None, map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_section(None, res_map),
        Value::Array(arr) => print_array_table(arr),
        other => println!("{}", other),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Enum variants serialize as single-key objects; keep those inline.
fn is_nested_record(value: &Value) -> bool {
    matches!(value, Value::Object(m) if m.len() > 1)
}

fn is_row_list(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if arr.first().is_some_and(Value::is_object))
}

/// Scalars as a Field/Value table, then nested objects and row lists below it.
fn print_section(title: Option<&str>, map: &Map<String, Value>) {
    if let Some(t) = title {
        println!("\n{}", t);
    }

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut has_scalars = false;
    for (key, val) in map {
        if is_nested_record(val) || is_row_list(val) {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
        has_scalars = true;
    }
    if has_scalars {
        println!("{}", Table::from(builder));
    }

    for (key, val) in map {
        match val {
            Value::Object(nested) if is_nested_record(val) => print_section(Some(key), nested),
            Value::Array(arr) if is_row_list(val) => {
                println!("\n{}", key);
                print_array_table(arr);
            }
            _ => {}
        }
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
