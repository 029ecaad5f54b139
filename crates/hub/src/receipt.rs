#![forbid(unsafe_code)]

use dh_core::device::{ComponentRecord, DeviceAttributes};
use dh_storage::IdentityRecordRow;
use serde::Serialize;

/// Outcome of one accepted submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
    pub uuid: String,
    pub algorithm: String,
    pub value: String,
    /// First six characters of `value`, uppercased.
    pub short_id: String,
    /// False when the (algorithm, uuid) pair was already on record and the
    /// submission was a no-op.
    pub inserted: bool,
    pub recorded_at_ms: i64,
    pub warnings: Vec<String>,
}

/// One device rendered for inspection: attributes and components from the
/// most recent stored evidence that still renders, plus the full record
/// history (one hop of alias equivalence, newest first).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceDetail {
    pub value: String,
    pub short_id: String,
    pub attributes: DeviceAttributes,
    pub components: Vec<ComponentRecord>,
    pub warnings: Vec<String>,
    pub history: Vec<IdentityRecordRow>,
}
