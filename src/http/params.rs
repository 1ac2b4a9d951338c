//! Request parameter lookup.
//!
//! A parameter may arrive as a header or as a query argument; headers win.
//! Several names can be given for one parameter (e.g. `x-format`, `format`).

use std::collections::HashMap;

use axum::http::HeaderMap;

/// First non-empty value among the named headers, then the named query
/// arguments (looked up lower-cased). Empty string when none is set.
pub fn read_param(headers: &HeaderMap, query: &HashMap<String, String>, names: &[&str]) -> String {
    let value = read_header_param(headers, names);
    if !value.is_empty() {
        return value;
    }
    read_query_param(query, names)
}

pub fn read_header_param(headers: &HeaderMap, names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

pub fn read_query_param(query: &HashMap<String, String>, names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| query.get(&name.to_lowercase()))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// `1`, `yes` and `true` are true; any other non-empty value is false.
pub fn read_bool_param(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    default: bool,
    names: &[&str],
) -> bool {
    let value = read_param(headers, query, names).to_lowercase();
    if value.is_empty() {
        return default;
    }
    matches!(value.as_str(), "1" | "yes" | "true")
}
