#![forbid(unsafe_code)]

use std::collections::BTreeMap;

/// Canonical device attributes extracted from one evidence payload. Every
/// variant extractor fills what its source carries; absent fields stay empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceAttributes {
    pub manufacturer: String,
    pub model: String,
    pub chassis: String,
    pub serial_number: String,
    pub sku: String,
    pub version: String,
}

impl DeviceAttributes {
    pub fn is_empty(&self) -> bool {
        self.manufacturer.is_empty()
            && self.model.is_empty()
            && self.chassis.is_empty()
            && self.serial_number.is_empty()
            && self.sku.is_empty()
            && self.version.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKind {
    Motherboard,
    Processor,
    RamModule,
    GraphicCard,
    Storage,
    NetworkAdapter,
    SoundCard,
    Display,
    Battery,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Motherboard => "Motherboard",
            ComponentKind::Processor => "Processor",
            ComponentKind::RamModule => "RamModule",
            ComponentKind::GraphicCard => "GraphicCard",
            ComponentKind::Storage => "Storage",
            ComponentKind::NetworkAdapter => "NetworkAdapter",
            ComponentKind::SoundCard => "SoundCard",
            ComponentKind::Display => "Display",
            ComponentKind::Battery => "Battery",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Motherboard" => Some(ComponentKind::Motherboard),
            "Processor" => Some(ComponentKind::Processor),
            "RamModule" => Some(ComponentKind::RamModule),
            "GraphicCard" => Some(ComponentKind::GraphicCard),
            "Storage" => Some(ComponentKind::Storage),
            "NetworkAdapter" => Some(ComponentKind::NetworkAdapter),
            "SoundCard" => Some(ComponentKind::SoundCard),
            "Display" => Some(ComponentKind::Display),
            "Battery" => Some(ComponentKind::Battery),
            _ => None,
        }
    }
}

/// One hardware component found in an evidence payload. Field names follow
/// the source payloads; the map keeps a stable order so downstream digests
/// over components stay reproducible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentRecord {
    pub kind: ComponentKind,
    pub fields: BTreeMap<String, String>,
}

impl ComponentRecord {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn set_opt(&mut self, key: &str, value: Option<String>) {
        if let Some(value) = value {
            self.fields.insert(key.to_string(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvidenceCategory {
    GeneralDevice,
    Display,
    Disk,
    Photographic,
}

impl EvidenceCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EvidenceCategory::GeneralDevice => "GeneralDevice",
            EvidenceCategory::Display => "Display",
            EvidenceCategory::Disk => "Disk",
            EvidenceCategory::Photographic => "Photographic",
        }
    }
}
