//! Loading the exported `searchindex.json`.
//!
//! Sphinx's own `searchindex.js` stores stemmed terms (`instal`, `usag`) and
//! `titleterms`, so term lookups only make sense against the JSON export.

use serde_json::Value;

/// Parse search index JSON.
pub fn parse(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text.trim())
}

/// Whether `index` is an object with a top-level `key`.
pub fn has_key(index: &Value, key: &str) -> bool {
    index.as_object().is_some_and(|obj| obj.contains_key(key))
}

/// Entries under `key`: object keys, or string elements of an array.
pub fn entries<'a>(index: &'a Value, key: &str) -> Vec<&'a str> {
    match index.get(key) {
        Some(Value::Object(map)) => map.keys().map(String::as_str).collect(),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Whether any entry under `key` contains `needle`.
pub fn contains_term(index: &Value, key: &str, needle: &str) -> bool {
    entries(index, key).iter().any(|term| term.contains(needle))
}
