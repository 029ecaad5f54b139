#![forbid(unsafe_code)]

mod ancient;
mod credential;
mod disk;
mod display;
mod dmi;
mod inxi;
mod legacy;
mod modern;
mod variant;

pub use variant::{EvidenceVariant, classify};

use dh_core::device::{ComponentRecord, DeviceAttributes, EvidenceCategory};
use serde_json::Value;

/// Canonical view of one evidence payload: who the device claims to be,
/// what was found inside it, and anything the extractor had to skip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedEvidence {
    pub uuid: String,
    pub variant: EvidenceVariant,
    pub category: EvidenceCategory,
    pub attributes: DeviceAttributes,
    pub components: Vec<ComponentRecord>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    /// The payload lacks the minimum dataset for its variant; nothing is
    /// extracted and no identity is computed.
    MissingRequiredData(&'static str),
    /// No dispatch rule applies: the payload is not an object, or carries a
    /// malformed category tag.
    UnrecognizedVariant,
}

impl std::fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeError::MissingRequiredData(what) => {
                write!(f, "evidence is missing required data: {what}")
            }
            NormalizeError::UnrecognizedVariant => write!(f, "unrecognized evidence variant"),
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Classify the payload and run the matching extractor. Per-field problems
/// inside a variant degrade to empty values plus a warning; only a missing
/// minimum dataset or an unrecognizable payload is an error.
pub fn normalize(payload: &Value) -> Result<NormalizedEvidence, NormalizeError> {
    match variant::classify(payload)? {
        EvidenceVariant::Signed => {
            let unwrapped = credential::unwrap(payload);
            let mut normalized = modern::extract(&unwrapped)?;
            normalized.variant = EvidenceVariant::Signed;
            Ok(normalized)
        }
        EvidenceVariant::Ancient => ancient::extract(payload),
        EvidenceVariant::LegacyBios => legacy::extract(payload),
        EvidenceVariant::Display => display::extract(payload),
        EvidenceVariant::Disk => disk::extract(payload),
        EvidenceVariant::Modern => modern::extract(payload),
    }
}

pub(crate) fn require_uuid(payload: &Value) -> Result<String, NormalizeError> {
    payload
        .get("uuid")
        .and_then(Value::as_str)
        .map(|uuid| uuid.trim().to_string())
        .filter(|uuid| !uuid.is_empty())
        .ok_or(NormalizeError::MissingRequiredData("evidence uuid"))
}

/// Render a scalar JSON value the way the source tools print it. Containers
/// and nulls come back empty; extractors skip those fields.
pub(crate) fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn require_uuid_trims_and_rejects_blank() {
        let payload = json!({"uuid": " 9f10a9c2-7d2e-4d2f-9b5a-0c6c83fe9d01 "});
        assert_eq!(
            require_uuid(&payload).expect("uuid"),
            "9f10a9c2-7d2e-4d2f-9b5a-0c6c83fe9d01"
        );
        assert_eq!(
            require_uuid(&json!({"uuid": ""})),
            Err(NormalizeError::MissingRequiredData("evidence uuid"))
        );
        assert_eq!(
            require_uuid(&json!({})),
            Err(NormalizeError::MissingRequiredData("evidence uuid"))
        );
    }

    #[test]
    fn scalar_string_renders_numbers_and_bools() {
        assert_eq!(scalar_string(&json!("abc")), "abc");
        assert_eq!(scalar_string(&json!(1600)), "1600");
        assert_eq!(scalar_string(&json!(true)), "true");
        assert_eq!(scalar_string(&json!(null)), "");
        assert_eq!(scalar_string(&json!([1, 2])), "");
    }
}
