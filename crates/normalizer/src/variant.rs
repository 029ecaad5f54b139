#![forbid(unsafe_code)]

use crate::NormalizeError;
use serde_json::Value;

pub(crate) const WORKBENCH_SCRIPT: &str = "workbench-script";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvidenceVariant {
    /// Credential-subject wrapper around a Modern payload.
    Signed,
    /// Pre-normalization tool output, already shaped like the canonical
    /// schema.
    Ancient,
    /// Older workbench build carrying a hardware-tree dump.
    LegacyBios,
    Display,
    Disk,
    Modern,
}

impl EvidenceVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            EvidenceVariant::Signed => "Signed",
            EvidenceVariant::Ancient => "Ancient",
            EvidenceVariant::LegacyBios => "LegacyBios",
            EvidenceVariant::Display => "Display",
            EvidenceVariant::Disk => "Disk",
            EvidenceVariant::Modern => "Modern",
        }
    }
}

/// Pick the extractor for a payload. Rules are ordered; the first match
/// wins, and the last rule is a catch-all.
pub fn classify(payload: &Value) -> Result<EvidenceVariant, NormalizeError> {
    let Some(root) = payload.as_object() else {
        return Err(NormalizeError::UnrecognizedVariant);
    };

    if root.contains_key("credentialSubject") {
        return Ok(EvidenceVariant::Signed);
    }

    if let Some(software) = root.get("software") {
        if software.as_str() != Some(WORKBENCH_SCRIPT) {
            return Ok(EvidenceVariant::Ancient);
        }
    }

    if let Some(lshw) = root.get("data").and_then(|data| data.get("lshw")) {
        let present = match lshw {
            Value::Object(map) => !map.is_empty(),
            Value::String(text) => !text.trim().is_empty(),
            Value::Null => false,
            _ => false,
        };
        if present {
            return Ok(EvidenceVariant::LegacyBios);
        }
    }

    if let Some(kind) = root.get("type") {
        let Some(kind) = kind.as_str() else {
            return Err(NormalizeError::UnrecognizedVariant);
        };
        match kind {
            "Display" => return Ok(EvidenceVariant::Display),
            "Disk" => return Ok(EvidenceVariant::Disk),
            _ => {}
        }
    }

    Ok(EvidenceVariant::Modern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credential_wrapper_wins_over_everything() {
        let payload = json!({
            "credentialSubject": {"uuid": "x"},
            "software": "Workbench",
            "type": "Display",
            "data": {"lshw": {"id": "computer"}},
        });
        assert_eq!(classify(&payload), Ok(EvidenceVariant::Signed));
    }

    #[test]
    fn foreign_software_tag_is_ancient() {
        let payload = json!({"software": "Workbench", "device": {}});
        assert_eq!(classify(&payload), Ok(EvidenceVariant::Ancient));
    }

    #[test]
    fn hardware_tree_beats_type_tags() {
        let payload = json!({
            "software": WORKBENCH_SCRIPT,
            "type": "Display",
            "data": {"lshw": {"id": "computer"}},
        });
        assert_eq!(classify(&payload), Ok(EvidenceVariant::LegacyBios));
    }

    #[test]
    fn empty_hardware_tree_does_not_count() {
        let payload = json!({
            "software": WORKBENCH_SCRIPT,
            "type": "Disk",
            "data": {"lshw": {}},
        });
        assert_eq!(classify(&payload), Ok(EvidenceVariant::Disk));
    }

    #[test]
    fn type_tags_route_display_and_disk() {
        let display = json!({"software": WORKBENCH_SCRIPT, "type": "Display", "data": {}});
        assert_eq!(classify(&display), Ok(EvidenceVariant::Display));
        let disk = json!({"software": WORKBENCH_SCRIPT, "type": "Disk", "data": {}});
        assert_eq!(classify(&disk), Ok(EvidenceVariant::Disk));
    }

    #[test]
    fn workbench_script_defaults_to_modern() {
        let payload = json!({"software": WORKBENCH_SCRIPT, "data": {"inxi": "[]"}});
        assert_eq!(classify(&payload), Ok(EvidenceVariant::Modern));
        let untagged = json!({"data": {"inxi": "[]"}});
        assert_eq!(classify(&untagged), Ok(EvidenceVariant::Modern));
    }

    #[test]
    fn malformed_type_tag_is_unrecognized() {
        let payload = json!({"software": WORKBENCH_SCRIPT, "type": 17, "data": {}});
        assert_eq!(classify(&payload), Err(NormalizeError::UnrecognizedVariant));
        assert_eq!(
            classify(&json!(["not", "an", "object"])),
            Err(NormalizeError::UnrecognizedVariant)
        );
    }
}
