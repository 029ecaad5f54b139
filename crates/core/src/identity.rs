#![forbid(unsafe_code)]

use crate::device::{DeviceAttributes, EvidenceCategory};
use sha3::{Digest as _, Sha3_256};
use std::fmt::Write as _;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeField {
    Manufacturer,
    Model,
    Chassis,
    SerialNumber,
    Sku,
    Version,
}

impl AttributeField {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeField::Manufacturer => "manufacturer",
            AttributeField::Model => "model",
            AttributeField::Chassis => "chassis",
            AttributeField::SerialNumber => "serialNumber",
            AttributeField::Sku => "sku",
            AttributeField::Version => "version",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manufacturer" => Some(AttributeField::Manufacturer),
            "model" => Some(AttributeField::Model),
            "chassis" => Some(AttributeField::Chassis),
            "serialNumber" => Some(AttributeField::SerialNumber),
            "sku" => Some(AttributeField::Sku),
            "version" => Some(AttributeField::Version),
            _ => None,
        }
    }

    fn select(self, attrs: &DeviceAttributes) -> &str {
        match self {
            AttributeField::Manufacturer => &attrs.manufacturer,
            AttributeField::Model => &attrs.model,
            AttributeField::Chassis => &attrs.chassis,
            AttributeField::SerialNumber => &attrs.serial_number,
            AttributeField::Sku => &attrs.sku,
            AttributeField::Version => &attrs.version,
        }
    }
}

/// A named hashing algorithm: a registry key plus the ordered attribute list
/// it concatenates. The key is recorded alongside every identity value so a
/// deployment can roll out a new algorithm without orphaning old records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlgorithmSpec {
    pub key: String,
    pub fields: Vec<AttributeField>,
}

impl AlgorithmSpec {
    pub fn new(key: impl Into<String>, fields: Vec<AttributeField>) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }
}

/// Category → algorithm mapping. Injected wherever identities are computed;
/// deployments override the defaults through service configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityConfig {
    pub general: AlgorithmSpec,
    pub display: AlgorithmSpec,
    pub disk: AlgorithmSpec,
    pub photographic: AlgorithmSpec,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        use AttributeField::*;
        Self {
            general: AlgorithmSpec::new(
                "ereuse24",
                vec![Manufacturer, Model, Chassis, SerialNumber, Sku],
            ),
            display: AlgorithmSpec::new(
                "display25",
                vec![Manufacturer, Model, SerialNumber, Version],
            ),
            disk: AlgorithmSpec::new("disk25", vec![Manufacturer, Model, SerialNumber, Version]),
            photographic: AlgorithmSpec::new("photo25", vec![Manufacturer, Model, SerialNumber]),
        }
    }
}

impl IdentityConfig {
    pub fn spec_for(&self, category: EvidenceCategory) -> &AlgorithmSpec {
        match category {
            EvidenceCategory::GeneralDevice => &self.general,
            EvidenceCategory::Display => &self.display,
            EvidenceCategory::Disk => &self.disk,
            EvidenceCategory::Photographic => &self.photographic,
        }
    }

    /// Deterministic identity: attribute values concatenated in algorithm
    /// order (absent field contributes nothing), hashed with SHA3-256,
    /// rendered as lowercase hex.
    pub fn compute(&self, attrs: &DeviceAttributes, category: EvidenceCategory) -> IdentityDigest {
        let spec = self.spec_for(category);
        let mut concat = String::new();
        for field in &spec.fields {
            concat.push_str(field.select(attrs));
        }
        IdentityDigest {
            algorithm: spec.key.clone(),
            value: hash_hex(&concat),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityDigest {
    pub algorithm: String,
    pub value: String,
}

pub fn hash_hex(input: &str) -> String {
    let digest = Sha3_256::digest(input.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha3::{Digest as _, Sha3_256};
    use std::fmt::Write as _;

    fn reference_hex(input: &str) -> String {
        let digest = Sha3_256::digest(input.as_bytes());
        let mut out = String::new();
        for b in digest {
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    fn dell_laptop() -> DeviceAttributes {
        DeviceAttributes {
            manufacturer: "Dell".to_string(),
            model: "X1".to_string(),
            chassis: "Laptop".to_string(),
            serial_number: "SN1".to_string(),
            sku: String::new(),
            version: String::new(),
        }
    }

    #[test]
    fn default_algorithm_concatenates_in_fixed_order() {
        let config = IdentityConfig::default();
        let digest = config.compute(&dell_laptop(), EvidenceCategory::GeneralDevice);
        assert_eq!(digest.algorithm, "ereuse24");
        assert_eq!(digest.value, reference_hex("DellX1LaptopSN1"));
    }

    #[test]
    fn identical_attributes_always_hash_identically() {
        let config = IdentityConfig::default();
        let first = config.compute(&dell_laptop(), EvidenceCategory::GeneralDevice);
        let second = config.compute(&dell_laptop(), EvidenceCategory::GeneralDevice);
        assert_eq!(first, second);
    }

    #[test]
    fn category_selects_its_own_algorithm() {
        let config = IdentityConfig::default();
        let attrs = DeviceAttributes {
            manufacturer: "Samsung".to_string(),
            model: "S24E450".to_string(),
            serial_number: "H4ZH902817".to_string(),
            version: "1.3".to_string(),
            ..DeviceAttributes::default()
        };
        let digest = config.compute(&attrs, EvidenceCategory::Display);
        assert_eq!(digest.algorithm, "display25");
        assert_eq!(digest.value, reference_hex("SamsungS24E450H4ZH9028171.3"));
    }

    #[test]
    fn empty_attributes_hash_the_empty_string() {
        let config = IdentityConfig::default();
        let digest = config.compute(&DeviceAttributes::default(), EvidenceCategory::GeneralDevice);
        // SHA3-256 of the empty message, straight out of FIPS 202.
        assert_eq!(
            digest.value,
            "a7ffc6f8bf1ed76651c14756a061d62bdf1391fcdab21e7a1d086ef9e6c98d4f"
        );
        assert_eq!(digest.value, reference_hex(""));
    }

    #[test]
    fn attribute_field_names_round_trip() {
        for field in [
            AttributeField::Manufacturer,
            AttributeField::Model,
            AttributeField::Chassis,
            AttributeField::SerialNumber,
            AttributeField::Sku,
            AttributeField::Version,
        ] {
            assert_eq!(AttributeField::parse(field.as_str()), Some(field));
        }
        assert_eq!(AttributeField::parse("mac"), None);
    }
}
