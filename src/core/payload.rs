//! Shape-agnostic access to structured API payloads
//!
//! The rates API has published the same rows under several envelopes over time
//! (bare arrays, `{"data": [...]}`, `{"results": [...]}`, several arrays keyed by
//! provider). Nothing here assumes a shape; every access is type-checked.

use super::number::parse_number;
use serde_json::Value;
use tracing::debug;

/// Envelope keys checked, in order, for the list of rows.
const ROW_LIST_KEYS: [&str; 4] = ["data", "results", "wallets", "items"];

/// Keys that may carry a row's display name, in priority order.
const NAME_KEYS: [&str; 5] = ["name", "wallet", "billetera", "entidad", "proveedor"];

/// Keys that may carry a row's rate, in priority order.
const RATE_KEYS: [&str; 6] = [
    "tna",
    "tea",
    "rate",
    "tasa",
    "tasa_nominal_anual",
    "rendimiento",
];

/// Locates the list of row-like records inside an arbitrary payload.
pub fn flatten(payload: &Value) -> Vec<&Value> {
    match payload {
        Value::Array(rows) => rows.iter().collect(),
        Value::Object(map) => {
            if let Some(rows) = ROW_LIST_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
            {
                return rows.iter().collect();
            }
            map.values()
                .filter_map(Value::as_array)
                .flat_map(|rows| rows.iter())
                .collect()
        }
        _ => Vec::new(),
    }
}

fn row_name(row: &serde_json::Map<String, Value>) -> Option<&str> {
    NAME_KEYS
        .iter()
        .filter_map(|key| row.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
}

fn row_rate(row: &serde_json::Map<String, Value>) -> Option<f64> {
    RATE_KEYS
        .iter()
        .filter_map(|key| row.get(*key))
        .find_map(parse_number)
}

/// Finds the first row whose name contains one of `aliases` and returns its rate.
pub fn match_rate(rows: &[&Value], aliases: &[String]) -> Option<f64> {
    let aliases: Vec<String> = aliases.iter().map(|a| a.to_lowercase()).collect();

    for row in rows.iter().filter_map(|row| row.as_object()) {
        let Some(name) = row_name(row) else {
            continue;
        };
        let name = name.to_lowercase();
        if !aliases.iter().any(|alias| name.contains(alias.as_str())) {
            continue;
        }
        if let Some(rate) = row_rate(row) {
            debug!(name = %name, rate, "Matched structured row");
            return Some(rate);
        }
        debug!(name = %name, "Matched row carries no parseable rate");
    }
    None
}
