#![forbid(unsafe_code)]

use crate::scalar_string;
use serde_json::Value;

// The live-enumeration dump is a list of one-entry maps, one per section,
// keyed like "004#Machine". Each section holds rows whose keys embed the
// field name after a '#', like "006#1#2#System". Lookups therefore match by
// substring, exactly as the producing tool intends.

pub(crate) fn section<'a>(inxi: &'a Value, name: &str) -> Option<&'a Vec<Value>> {
    for entry in inxi.as_array()? {
        let Some(map) = entry.as_object() else {
            continue;
        };
        for (key, value) in map {
            if key.contains(name) {
                return value.as_array();
            }
        }
    }
    None
}

pub(crate) fn field<'a>(row: &'a Value, name: &str) -> Option<&'a Value> {
    let map = row.as_object()?;
    let marker = format!("#{name}");
    map.iter()
        .find(|(key, _)| key.contains(&marker))
        .map(|(_, value)| value)
}

pub(crate) fn field_str(row: &Value, name: &str) -> String {
    field(row, name).map(scalar_string).unwrap_or_default()
}

/// Decode the raw dataset: it usually arrives as a JSON string inside the
/// payload, occasionally as an already-parsed array.
pub(crate) fn decode(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::String(text) => {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(text).map_err(|err| format!("undecodable inxi dataset: {err}"))
        }
        Value::Array(_) => Ok(raw.clone()),
        Value::Null => Ok(Value::Null),
        _ => Err("inxi dataset is neither text nor a list".to_string()),
    }
}
