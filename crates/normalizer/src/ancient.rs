#![forbid(unsafe_code)]

use crate::variant::EvidenceVariant;
use crate::{NormalizeError, NormalizedEvidence, require_uuid, scalar_string};
use dh_core::device::{ComponentKind, ComponentRecord, DeviceAttributes, EvidenceCategory};
use serde_json::Value;

/// Pre-normalization tool output: the payload already carries a canonical
/// `device` object and `components` list, so nothing is parsed and fields
/// are copied across. Nested workflow data (action lists and the like) is
/// not component data and is left behind.
pub(crate) fn extract(payload: &Value) -> Result<NormalizedEvidence, NormalizeError> {
    let uuid = require_uuid(payload)?;
    let mut warnings = Vec::new();

    let device = payload.get("device").and_then(Value::as_object);
    if device.is_none() {
        warnings.push("no device object; attributes left empty".to_string());
    }
    let field = |name: &str| -> String {
        device
            .and_then(|map| map.get(name))
            .map(scalar_string)
            .unwrap_or_default()
    };
    let attributes = DeviceAttributes {
        manufacturer: field("manufacturer"),
        model: field("model"),
        chassis: field("chassis"),
        serial_number: field("serialNumber"),
        sku: field("sku"),
        version: String::new(),
    };

    let mut components = Vec::new();
    if let Some(raw) = payload.get("components").and_then(Value::as_array) {
        for entry in raw {
            let Some(map) = entry.as_object() else {
                warnings.push("skipped a non-object component entry".to_string());
                continue;
            };
            let kind = map.get("type").and_then(Value::as_str);
            let Some(kind) = kind.and_then(ComponentKind::parse) else {
                warnings.push(format!(
                    "skipped component with unknown type {:?}",
                    kind.unwrap_or("<missing>")
                ));
                continue;
            };
            let mut record = ComponentRecord::new(kind);
            for (key, value) in map {
                if key == "type" || key == "actions" {
                    continue;
                }
                if value.is_object() || value.is_array() || value.is_null() {
                    continue;
                }
                record.set(key, scalar_string(value));
            }
            components.push(record);
        }
    }

    Ok(NormalizedEvidence {
        uuid,
        variant: EvidenceVariant::Ancient,
        category: EvidenceCategory::GeneralDevice,
        attributes,
        components,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn copies_device_fields_verbatim() {
        let payload = json!({
            "uuid": "11111111-2222-4333-8444-555555555555",
            "software": "Workbench",
            "device": {
                "manufacturer": "HP",
                "model": "ProBook 650 G1",
                "chassis": "Laptop",
                "serialNumber": "CND4480",
                "sku": "D9S33AV",
            },
        });
        let normalized = extract(&payload).expect("normalizes");
        assert_eq!(normalized.attributes.manufacturer, "HP");
        assert_eq!(normalized.attributes.model, "ProBook 650 G1");
        assert_eq!(normalized.attributes.chassis, "Laptop");
        assert_eq!(normalized.attributes.serial_number, "CND4480");
        assert_eq!(normalized.attributes.sku, "D9S33AV");
        assert_eq!(normalized.attributes.version, "");
        assert_eq!(normalized.category, EvidenceCategory::GeneralDevice);
    }

    #[test]
    fn components_pass_through_minus_action_noise() {
        let payload = json!({
            "uuid": "11111111-2222-4333-8444-555555555555",
            "device": {},
            "components": [
                {
                    "type": "Processor",
                    "model": "Intel Core i5-4200M",
                    "cores": 2,
                    "actions": [{"type": "BenchmarkProcessor"}],
                },
                {"type": "Dock", "model": "mystery"},
                "not-a-component",
            ],
        });
        let normalized = extract(&payload).expect("normalizes");
        assert_eq!(normalized.components.len(), 1);
        let cpu = &normalized.components[0];
        assert_eq!(cpu.kind, ComponentKind::Processor);
        assert_eq!(cpu.get("model"), Some("Intel Core i5-4200M"));
        assert_eq!(cpu.get("cores"), Some("2"));
        assert_eq!(cpu.get("actions"), None);
        assert_eq!(normalized.warnings.len(), 2);
    }

    #[test]
    fn missing_device_object_degrades_to_empty() {
        let payload = json!({"uuid": "11111111-2222-4333-8444-555555555555"});
        let normalized = extract(&payload).expect("normalizes");
        assert!(normalized.attributes.is_empty());
        assert!(!normalized.warnings.is_empty());
    }
}
