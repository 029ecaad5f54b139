#![forbid(unsafe_code)]

use serde_json::{Map, Value};

/// Flatten a credential-subject wrapper: the subject's fields override the
/// envelope, and its evidence list of (operation, output) pairs becomes the
/// `data` map the Modern extractor expects. Signatures are not verified
/// here; issuance and verification live outside this crate.
pub(crate) fn unwrap(payload: &Value) -> Value {
    let mut merged = payload.as_object().cloned().unwrap_or_default();

    if let Some(subject) = payload.get("credentialSubject").and_then(Value::as_object) {
        for (key, value) in subject {
            merged.insert(key.clone(), value.clone());
        }
    }

    let operations = merged
        .get("evidence")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if !operations.is_empty() {
        let mut data = Map::new();
        for entry in &operations {
            let Some(operation) = entry.get("operation").and_then(Value::as_str) else {
                continue;
            };
            data.insert(
                operation.to_string(),
                entry.get("output").cloned().unwrap_or(Value::Null),
            );
        }
        merged.insert("data".to_string(), Value::Object(data));
    }

    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subject_fields_override_the_envelope() {
        let payload = json!({
            "uuid": "envelope-uuid",
            "credentialSubject": {
                "uuid": "11111111-2222-4333-8444-555555555555",
                "software": "workbench-script",
            },
        });
        let unwrapped = unwrap(&payload);
        assert_eq!(
            unwrapped["uuid"],
            json!("11111111-2222-4333-8444-555555555555")
        );
        assert_eq!(unwrapped["software"], json!("workbench-script"));
    }

    #[test]
    fn evidence_list_becomes_data_map() {
        let payload = json!({
            "credentialSubject": {
                "uuid": "11111111-2222-4333-8444-555555555555",
                "evidence": [
                    {"operation": "inxi", "output": "[]"},
                    {"operation": "dmidecode", "output": "BIOS"},
                    {"output": "orphan, no operation"},
                ],
            },
        });
        let unwrapped = unwrap(&payload);
        assert_eq!(unwrapped["data"]["inxi"], json!("[]"));
        assert_eq!(unwrapped["data"]["dmidecode"], json!("BIOS"));
        assert_eq!(unwrapped["data"].as_object().map(|m| m.len()), Some(2));
    }

    #[test]
    fn missing_evidence_list_keeps_existing_data() {
        let payload = json!({
            "data": {"inxi": "[]"},
            "credentialSubject": {"uuid": "11111111-2222-4333-8444-555555555555"},
        });
        let unwrapped = unwrap(&payload);
        assert_eq!(unwrapped["data"]["inxi"], json!("[]"));
    }
}
