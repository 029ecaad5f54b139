#![forbid(unsafe_code)]

use crate::variant::EvidenceVariant;
use crate::{NormalizeError, NormalizedEvidence, require_uuid};
use dh_core::device::{ComponentKind, ComponentRecord, DeviceAttributes, EvidenceCategory};
use serde_json::Value;
use std::collections::BTreeMap;

// EDID PNP manufacturer ids seen on refurbished stock. Unknown codes pass
// through unresolved.
const PNP_VENDORS: &[(&str, &str)] = &[
    ("ACI", "Ancor Communications"),
    ("ACR", "Acer"),
    ("AOC", "AOC"),
    ("APP", "Apple"),
    ("AUO", "AU Optronics"),
    ("BNQ", "BenQ"),
    ("BOE", "BOE"),
    ("CMN", "Chimei Innolux"),
    ("DEL", "Dell"),
    ("ENC", "Eizo"),
    ("GSM", "LG"),
    ("HWP", "Hewlett-Packard"),
    ("HPN", "Hewlett-Packard"),
    ("IVM", "Iiyama"),
    ("LEN", "Lenovo"),
    ("LGD", "LG Display"),
    ("MSI", "MSI"),
    ("NEC", "NEC"),
    ("PHL", "Philips"),
    ("SAM", "Samsung"),
    ("SEC", "Samsung"),
    ("SHP", "Sharp"),
    ("SNY", "Sony"),
    ("VSC", "ViewSonic"),
];

pub(crate) fn resolve_pnp(code: &str) -> &str {
    PNP_VENDORS
        .iter()
        .find(|(id, _)| *id == code)
        .map(|(_, vendor)| *vendor)
        .unwrap_or(code)
}

#[derive(Debug, Default)]
struct EdidSection {
    fields: BTreeMap<String, String>,
    misc: Vec<String>,
}

/// The decode text is a sequence of flush-left section headers followed by
/// indented lines. Indented `key: value` lines land in the section's field
/// map regardless of nesting depth; indented lines without a colon are kept
/// verbatim as loose notes.
fn parse_sections(text: &str) -> BTreeMap<String, EdidSection> {
    let mut sections: BTreeMap<String, EdidSection> = BTreeMap::new();
    let mut current: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }
        if !line.starts_with(' ') {
            let header = line.trim_matches(':').to_string();
            sections.insert(header.clone(), EdidSection::default());
            current = Some(header);
            continue;
        }
        let Some(header) = current.as_ref() else {
            continue;
        };
        let Some(section) = sections.get_mut(header) else {
            continue;
        };
        match line.split_once(':') {
            Some((key, value)) => {
                section
                    .fields
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            None => section.misc.push(line.trim().to_string()),
        }
    }
    sections
}

/// Monitor evidence: one EDID decode text block describes the whole device,
/// so the extractor yields the device attributes plus a single pseudo
/// component carrying everything worth showing.
pub(crate) fn extract(payload: &Value) -> Result<NormalizedEvidence, NormalizeError> {
    let uuid = require_uuid(payload)?;
    let mut warnings = Vec::new();

    let text = payload
        .get("data")
        .and_then(|data| data.get("edid_decode"))
        .and_then(Value::as_str)
        .unwrap_or("");
    if text.trim().is_empty() {
        warnings.push("no EDID decode text; display attributes left empty".to_string());
        return Ok(NormalizedEvidence {
            uuid,
            variant: EvidenceVariant::Display,
            category: EvidenceCategory::Display,
            attributes: DeviceAttributes::default(),
            components: Vec::new(),
            warnings,
        });
    }

    let sections = parse_sections(text);
    let base = sections.get("Block 0, Base EDID");
    let native = sections.get("Native Video Resolution");

    let field = |key: &str| -> Option<String> {
        base.and_then(|section| section.fields.get(key)).cloned()
    };
    let manufacturer = field("Manufacturer").map(|code| resolve_pnp(&code).to_string());
    let model = field("Model");
    let serial_number = field("Serial Number");
    let version = field("EDID Structure Version & Revision");

    let mut record = ComponentRecord::new(ComponentKind::Display);
    record.set_opt("Manufacturer", manufacturer.clone());
    record.set_opt("EDID Version", version.clone());
    record.set_opt("Serial Number", serial_number.clone());
    record.set_opt("Model", model.clone());
    record.set_opt("Manufacture Date", field("Made in"));
    record.set_opt("Max Image Size", field("Maximum image size"));
    record.set_opt("Gamma", field("Gamma"));
    record.set_opt("Color Format", field("Supported color formats"));
    record.set_opt(
        "Native Resolution",
        native.and_then(|section| section.misc.first()).cloned(),
    );
    record.set_opt("Preferred Timing", field("DTD 1"));
    if let Some(section) = base {
        if !section.misc.is_empty() {
            record.set("Misc", format!("\n  - {}", section.misc.join("\n  - ")));
        }
    }

    let attributes = DeviceAttributes {
        manufacturer: manufacturer.unwrap_or_default(),
        model: model.unwrap_or_default(),
        chassis: String::new(),
        serial_number: serial_number.unwrap_or_default(),
        sku: String::new(),
        version: version.unwrap_or_default(),
    };

    let components = if record.fields.is_empty() {
        Vec::new()
    } else {
        vec![record]
    };

    Ok(NormalizedEvidence {
        uuid,
        variant: EvidenceVariant::Display,
        category: EvidenceCategory::Display,
        attributes,
        components,
        warnings,
    })
}
