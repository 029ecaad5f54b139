#![forbid(unsafe_code)]

use crate::HubError;
use dh_core::identity::{AlgorithmSpec, AttributeField, IdentityConfig};
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration. `storage_dir` is where the SQLite store lives,
/// `archive_dir` enables the payload journal when set, and `algorithms`
/// overrides the default category→algorithm table.
#[derive(Clone, Debug, Deserialize)]
pub struct HubConfig {
    pub storage_dir: PathBuf,
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
    #[serde(default)]
    pub algorithms: Option<AlgorithmTable>,
}

impl HubConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            archive_dir: None,
            algorithms: None,
        }
    }

    pub(crate) fn identity_config(&self) -> Result<IdentityConfig, HubError> {
        match &self.algorithms {
            None => Ok(IdentityConfig::default()),
            Some(table) => table.to_identity_config(),
        }
    }
}

/// Category→algorithm overrides, shaped for config files:
/// `{"general": {"key": "ereuse24", "fields": ["manufacturer", ...]}}`.
/// Categories left out keep their defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AlgorithmTable {
    pub general: Option<AlgorithmEntry>,
    pub display: Option<AlgorithmEntry>,
    pub disk: Option<AlgorithmEntry>,
    pub photographic: Option<AlgorithmEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AlgorithmEntry {
    pub key: String,
    pub fields: Vec<String>,
}

impl AlgorithmTable {
    fn to_identity_config(&self) -> Result<IdentityConfig, HubError> {
        let defaults = IdentityConfig::default();
        Ok(IdentityConfig {
            general: resolve(self.general.as_ref(), defaults.general)?,
            display: resolve(self.display.as_ref(), defaults.display)?,
            disk: resolve(self.disk.as_ref(), defaults.disk)?,
            photographic: resolve(self.photographic.as_ref(), defaults.photographic)?,
        })
    }
}

fn resolve(
    entry: Option<&AlgorithmEntry>,
    default: AlgorithmSpec,
) -> Result<AlgorithmSpec, HubError> {
    let Some(entry) = entry else {
        return Ok(default);
    };
    let key = entry.key.trim();
    if key.is_empty() {
        return Err(HubError::InvalidInput("algorithm key must not be empty"));
    }
    if entry.fields.is_empty() {
        return Err(HubError::InvalidInput(
            "algorithm field list must not be empty",
        ));
    }
    let mut fields = Vec::with_capacity(entry.fields.len());
    for name in &entry.fields {
        let field = AttributeField::parse(name).ok_or(HubError::InvalidInput(
            "unknown attribute field in algorithm config",
        ))?;
        fields.push(field);
    }
    Ok(AlgorithmSpec::new(key, fields))
}
