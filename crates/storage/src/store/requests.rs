#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordEvidenceRequest {
    pub owner: String,
    pub uuid: String,
    pub algorithm: String,
    pub value: String,
    pub submitted_by: Option<String>,
    pub payload_json: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordEvidenceOutcome {
    /// False when the (algorithm, uuid) pair was already recorded and the
    /// call was a no-op.
    pub inserted: bool,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListDevicesRequest {
    pub owner: String,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DevicePage {
    pub values: Vec<String>,
    /// Size of the full canonical set, before offset/limit.
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateAliasRequest {
    pub owner: String,
    pub alias: String,
    pub root: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasEdgeRow {
    pub seq: i64,
    pub alias: String,
    pub root: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityRecordRow {
    pub uuid: String,
    pub algorithm: String,
    pub value: String,
    pub submitted_by: Option<String>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvidenceRow {
    pub uuid: String,
    pub owner: String,
    pub submitted_by: Option<String>,
    pub payload_json: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotMemberRequest {
    pub owner: String,
    pub lot: String,
    pub value: String,
    pub created_at_ms: i64,
}
