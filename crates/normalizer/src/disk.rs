#![forbid(unsafe_code)]

use crate::variant::EvidenceVariant;
use crate::{NormalizeError, NormalizedEvidence, require_uuid, scalar_string};
use dh_core::device::{ComponentKind, ComponentRecord, DeviceAttributes, EvidenceCategory};
use serde_json::Value;

/// Standalone drive evidence: one S.M.A.R.T. diagnostic tree describes the
/// whole device. Attributes mirror the drive identity fields; the single
/// Storage pseudo-component keeps the health counters worth showing.
pub(crate) fn extract(payload: &Value) -> Result<NormalizedEvidence, NormalizeError> {
    let uuid = require_uuid(payload)?;
    let mut warnings = Vec::new();

    let Some(report) = decode_report(payload, &mut warnings) else {
        return Ok(NormalizedEvidence {
            uuid,
            variant: EvidenceVariant::Disk,
            category: EvidenceCategory::Disk,
            attributes: DeviceAttributes::default(),
            components: Vec::new(),
            warnings,
        });
    };

    let field = |key: &str| -> Option<String> {
        report
            .get(key)
            .filter(|value| !value.is_null())
            .map(scalar_string)
    };
    let manufacturer = field("model_family");
    let model = field("model_name");
    let serial_number = field("serial_number");
    let version = field("firmware_version");

    let attributes = DeviceAttributes {
        manufacturer: manufacturer.clone().unwrap_or_default(),
        model: model.clone().unwrap_or_default(),
        chassis: String::new(),
        serial_number: serial_number.clone().unwrap_or_default(),
        sku: String::new(),
        version: version.clone().unwrap_or_default(),
    };

    let rotation_rate = report.get("rotation_rate").and_then(Value::as_i64);
    let capacity_bytes = report
        .get("user_capacity")
        .and_then(|capacity| capacity.get("bytes"))
        .and_then(Value::as_i64)
        .filter(|bytes| *bytes != 0);

    let mut record = ComponentRecord::new(ComponentKind::Storage);
    record.set(
        "Device Type",
        if rotation_rate.unwrap_or(0) == 0 {
            "SolidStateDrive"
        } else {
            "HardDrive"
        },
    );
    record.set_opt("Manufacturer", manufacturer);
    record.set_opt("Model", model);
    record.set_opt("Serial Number", serial_number);
    record.set_opt("Firmware Version", version);
    record.set_opt(
        "Capacity (GB)",
        capacity_bytes.map(|bytes| format!("{:.2}", bytes as f64 / 1e9)),
    );
    record.set_opt(
        "Capacity (bytes)",
        capacity_bytes.map(|bytes| bytes.to_string()),
    );
    record.set_opt(
        "Form Factor",
        report
            .get("form_factor")
            .and_then(|form| form.get("name"))
            .map(scalar_string),
    );
    record.set_opt(
        "Interface Speed",
        report
            .get("interface_speed")
            .and_then(|speed| speed.get("current"))
            .and_then(|current| current.get("string"))
            .map(scalar_string),
    );
    record.set_opt(
        "SATA Version",
        report
            .get("sata_version")
            .and_then(|sata| sata.get("string"))
            .map(scalar_string),
    );
    record.set_opt(
        "Rotation Rate (RPM)",
        rotation_rate.map(|rate| rate.to_string()),
    );
    record.set(
        "Health Status",
        match report
            .get("smart_status")
            .and_then(|status| status.get("passed"))
            .and_then(Value::as_bool)
        {
            Some(true) => "PASSED",
            Some(false) => "FAILED",
            None => "Unknown",
        },
    );
    record.set_opt(
        "Power On Hours",
        report
            .get("power_on_time")
            .and_then(|time| time.get("hours"))
            .filter(|value| !value.is_null())
            .map(scalar_string),
    );
    record.set_opt("Reallocated Sector Count", ata_attribute(&report, 5));
    record.set_opt("Current Pending Sector Count", ata_attribute(&report, 197));
    record.set_opt(
        "Offline Uncorrectable Sector Count",
        ata_attribute(&report, 198),
    );
    record.set_opt(
        "SSD Percentage Used (NVMe)",
        report
            .get("nvme_smart_health_information_log")
            .and_then(|log| log.get("percentage_used"))
            .filter(|value| !value.is_null())
            .map(scalar_string),
    );
    record.set_opt("SSD Wear Indicator (SATA)", ata_attribute(&report, 233));

    Ok(NormalizedEvidence {
        uuid,
        variant: EvidenceVariant::Disk,
        category: EvidenceCategory::Disk,
        attributes,
        components: vec![record],
        warnings,
    })
}

/// The diagnostic may arrive as the report object, a one-report list, or a
/// JSON string of the report. Anything else degrades to empty output.
fn decode_report(payload: &Value, warnings: &mut Vec<String>) -> Option<Value> {
    let raw = payload.get("data").and_then(|data| data.get("smartctl"));
    let mut report = match raw {
        Some(Value::Array(items)) => items.first().cloned().unwrap_or(Value::Null),
        Some(value) => value.clone(),
        None => Value::Null,
    };
    if let Value::String(text) = &report {
        match serde_json::from_str(text) {
            Ok(decoded) => report = decoded,
            Err(err) => {
                warnings.push(format!("undecodable drive diagnostic: {err}"));
                return None;
            }
        }
    }
    match report {
        Value::Object(_) => Some(report),
        Value::Null => {
            warnings.push("no drive diagnostic; disk attributes left empty".to_string());
            None
        }
        _ => {
            warnings.push(
                "drive diagnostic is not an object; disk attributes left empty".to_string(),
            );
            None
        }
    }
}

fn ata_attribute(report: &Value, id: i64) -> Option<String> {
    report
        .get("ata_smart_attributes")
        .and_then(|attrs| attrs.get("table"))
        .and_then(Value::as_array)?
        .iter()
        .find(|attr| attr.get("id").and_then(Value::as_i64) == Some(id))
        .and_then(|attr| attr.get("raw"))
        .and_then(|raw| raw.get("value"))
        .filter(|value| !value.is_null())
        .map(scalar_string)
}
