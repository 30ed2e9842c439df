// crates/credence-cli/src/output.rs
//
// Output formatting for the credence binary. Every command prints JSON.

use serde::Serialize;

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

pub fn print_json<T: Serialize>(data: &T) {
    println!("{}", format_json(data));
}
