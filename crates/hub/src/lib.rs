#![forbid(unsafe_code)]

mod archive;
mod clock;
mod config;
mod receipt;

pub use archive::EvidenceArchive;
pub use clock::ts_ms_to_rfc3339;
pub use config::{AlgorithmEntry, AlgorithmTable, HubConfig};
pub use dh_storage::{DevicePage, IdentityRecordRow, StoreError};
pub use receipt::{DeviceDetail, SubmitReceipt};

use dh_core::device::DeviceAttributes;
use dh_core::identity::IdentityConfig;
use dh_core::ids::{EvidenceUuid, IdentityValue, OwnerId};
use dh_normalizer::{NormalizeError, normalize};
use dh_storage::{
    CreateAliasRequest, ListDevicesRequest, LotMemberRequest, RecordEvidenceRequest, SqliteStore,
};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug)]
pub enum HubError {
    Normalize(NormalizeError),
    Store(StoreError),
    InvalidInput(&'static str),
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normalize(err) => write!(f, "normalize: {err}"),
            Self::Store(err) => write!(f, "store: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl std::error::Error for HubError {}

impl From<NormalizeError> for HubError {
    fn from(value: NormalizeError) -> Self {
        Self::Normalize(value)
    }
}

impl From<StoreError> for HubError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Service front door: normalization, identity hashing, persistence and the
/// payload journal behind one handle. One hub per storage directory.
pub struct Hub {
    store: SqliteStore,
    identity: IdentityConfig,
    archive: Option<EvidenceArchive>,
}

impl Hub {
    pub fn open(config: HubConfig) -> Result<Self, HubError> {
        let identity = config.identity_config()?;
        let store = SqliteStore::open(&config.storage_dir)?;
        let archive = config.archive_dir.map(EvidenceArchive::new);
        Ok(Self {
            store,
            identity,
            archive,
        })
    }

    /// Accept one evidence payload: journal it, normalize it, compute the
    /// identity value for its category, and record it. Resubmission of an
    /// already-recorded (algorithm, uuid) pair succeeds as a no-op with the
    /// stored value.
    pub fn submit_evidence(
        &mut self,
        payload: &Value,
        owner: &str,
        submitted_by: Option<&str>,
    ) -> Result<SubmitReceipt, HubError> {
        let owner = OwnerId::try_new(owner).map_err(|err| HubError::InvalidInput(err.message()))?;
        let payload_json = payload.to_string();

        // Journal before any parsing; failed submissions leave their file in
        // incoming/ for inspection.
        let mut archive_warnings = Vec::new();
        let staged =
            self.stage_payload(owner.as_str(), payload, &payload_json, &mut archive_warnings);

        let normalized = normalize(payload)?;
        let uuid = EvidenceUuid::try_new(normalized.uuid.as_str())
            .map_err(|err| HubError::InvalidInput(err.message()))?;
        let digest = self
            .identity
            .compute(&normalized.attributes, normalized.category);
        let recorded_at_ms = clock::now_ms_i64();

        let outcome = self.store.record_evidence(RecordEvidenceRequest {
            owner: owner.as_str().to_string(),
            uuid: uuid.as_str().to_string(),
            algorithm: digest.algorithm.clone(),
            value: digest.value,
            submitted_by: submitted_by.map(str::to_string),
            payload_json,
            created_at_ms: recorded_at_ms,
        })?;

        if let (Some(archive), Some(staged)) = (self.archive.as_ref(), staged.as_ref()) {
            if let Err(err) = archive.promote(owner.as_str(), staged) {
                archive_warnings.push(format!("evidence archive promotion failed: {err}"));
            }
        }

        let mut warnings = normalized.warnings;
        warnings.extend(archive_warnings);

        let short_id = short_id_of(&outcome.value);
        Ok(SubmitReceipt {
            uuid: uuid.into_string(),
            algorithm: digest.algorithm,
            value: outcome.value,
            short_id,
            inserted: outcome.inserted,
            recorded_at_ms,
            warnings,
        })
    }

    pub fn list_devices(
        &self,
        owner: &str,
        offset: usize,
        limit: usize,
    ) -> Result<DevicePage, HubError> {
        Ok(self.store.list_devices(ListDevicesRequest {
            owner: owner.to_string(),
            offset,
            limit,
        })?)
    }

    pub fn list_unassigned_devices(
        &self,
        owner: &str,
        offset: usize,
        limit: usize,
    ) -> Result<DevicePage, HubError> {
        Ok(self.store.list_unassigned_devices(ListDevicesRequest {
            owner: owner.to_string(),
            offset,
            limit,
        })?)
    }

    pub fn create_alias(&mut self, owner: &str, alias: &str, root: &str) -> Result<(), HubError> {
        self.store.create_alias(CreateAliasRequest {
            owner: owner.to_string(),
            alias: alias.to_string(),
            root: root.to_string(),
            created_at_ms: clock::now_ms_i64(),
        })?;
        Ok(())
    }

    pub fn evidence_history(
        &self,
        owner: &str,
        value: &str,
    ) -> Result<Vec<IdentityRecordRow>, HubError> {
        Ok(self.store.evidence_history(owner, value)?)
    }

    pub fn lot_member_add(
        &mut self,
        owner: &str,
        lot: &str,
        value: &str,
    ) -> Result<bool, HubError> {
        Ok(self.store.lot_member_add(LotMemberRequest {
            owner: owner.to_string(),
            lot: lot.to_string(),
            value: value.to_string(),
            created_at_ms: clock::now_ms_i64(),
        })?)
    }

    pub fn lot_member_remove(
        &mut self,
        owner: &str,
        lot: &str,
        value: &str,
    ) -> Result<bool, HubError> {
        Ok(self.store.lot_member_remove(owner, lot, value)?)
    }

    /// Render one device: walk its history newest-first and re-normalize the
    /// first stored payload that still parses. `None` when the value has no
    /// records at all.
    pub fn device_detail(
        &self,
        owner: &str,
        value: &str,
    ) -> Result<Option<DeviceDetail>, HubError> {
        let value =
            IdentityValue::try_new(value).map_err(|err| HubError::InvalidInput(err.message()))?;
        let history = self.store.evidence_history(owner, value.as_str())?;
        if history.is_empty() {
            return Ok(None);
        }

        let mut warnings = Vec::new();
        let mut attributes = DeviceAttributes::default();
        let mut components = Vec::new();
        let mut rendered = false;
        for row in &history {
            let Some(evidence) = self.store.evidence_get(owner, &row.uuid)? else {
                continue;
            };
            let payload: Value = match serde_json::from_str(&evidence.payload_json) {
                Ok(payload) => payload,
                Err(_) => {
                    warnings.push(format!("stored evidence {} is not valid JSON", row.uuid));
                    continue;
                }
            };
            match normalize(&payload) {
                Ok(normalized) => {
                    warnings.extend(normalized.warnings);
                    attributes = normalized.attributes;
                    components = normalized.components;
                    rendered = true;
                    break;
                }
                Err(err) => warnings.push(format!(
                    "stored evidence {} no longer normalizes: {err}",
                    row.uuid
                )),
            }
        }
        if !rendered {
            warnings.push("no stored evidence payload could be rendered".to_string());
        }

        let short_id = value.short_id();
        Ok(Some(DeviceDetail {
            value: value.into_string(),
            short_id,
            attributes,
            components,
            warnings,
            history,
        }))
    }

    fn stage_payload(
        &self,
        owner: &str,
        payload: &Value,
        payload_json: &str,
        warnings: &mut Vec<String>,
    ) -> Option<PathBuf> {
        let archive = self.archive.as_ref()?;
        let uuid = payload
            .get("uuid")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim();
        match archive.stage(owner, uuid, payload_json) {
            Ok(path) => Some(path),
            Err(err) => {
                warnings.push(format!("evidence archive unavailable: {err}"));
                None
            }
        }
    }
}

fn short_id_of(value: &str) -> String {
    IdentityValue::try_new(value)
        .map(|value| value.short_id())
        .unwrap_or_default()
}
