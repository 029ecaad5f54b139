#![forbid(unsafe_code)]

use super::*;
use dh_core::canonical;
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    /// Record one accepted evidence submission together with its identity
    /// record. A (algorithm, uuid) pair that is already recorded makes the
    /// call a no-op; the outcome reports which way it went and the identity
    /// value that stands for the evidence.
    pub fn record_evidence(
        &mut self,
        request: RecordEvidenceRequest,
    ) -> Result<RecordEvidenceOutcome, StoreError> {
        let owner = canonicalize_owner(&request.owner)?;
        let uuid = canonicalize_uuid(&request.uuid)?;
        let value = canonicalize_value(&request.value)?;
        let algorithm = request.algorithm.trim().to_string();
        if algorithm.is_empty() {
            return Err(StoreError::InvalidInput("algorithm key must not be empty"));
        }

        let tx = self.conn.transaction()?;
        ensure_owner_tx(&tx, &owner, request.created_at_ms)?;

        let recorded = existing_value_tx(&tx, &algorithm, &uuid)?;
        if let Some(recorded) = recorded {
            tx.commit()?;
            return Ok(RecordEvidenceOutcome {
                inserted: false,
                value: recorded,
            });
        }

        tx.execute(
            "INSERT OR IGNORE INTO evidence(uuid, owner, submitted_by, payload_json, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid,
                owner,
                request.submitted_by,
                request.payload_json,
                request.created_at_ms
            ],
        )?;

        let insert = tx.execute(
            "INSERT INTO identity_records(owner, algorithm, value, uuid, submitted_by, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                owner,
                algorithm,
                value,
                uuid,
                request.submitted_by,
                request.created_at_ms
            ],
        );

        if let Err(err) = insert {
            if !is_constraint_violation(&err) {
                return Err(StoreError::Sql(err));
            }
            // Another writer landed the same pair between our check and the
            // insert; report theirs.
            let recorded = existing_value_tx(&tx, &algorithm, &uuid)?
                .ok_or(StoreError::InvalidInput("identity record vanished mid-insert"))?;
            tx.commit()?;
            return Ok(RecordEvidenceOutcome {
                inserted: false,
                value: recorded,
            });
        }

        tx.commit()?;
        Ok(RecordEvidenceOutcome {
            inserted: true,
            value,
        })
    }

    pub fn evidence_get(&self, owner: &str, uuid: &str) -> Result<Option<EvidenceRow>, StoreError> {
        let owner = canonicalize_owner(owner)?;
        let uuid = canonicalize_uuid(uuid)?;
        Ok(self
            .conn
            .query_row(
                "SELECT uuid, owner, submitted_by, payload_json, created_at_ms \
                 FROM evidence WHERE uuid=?1 AND owner=?2",
                params![uuid, owner],
                |row| {
                    Ok(EvidenceRow {
                        uuid: row.get(0)?,
                        owner: row.get(1)?,
                        submitted_by: row.get(2)?,
                        payload_json: row.get(3)?,
                        created_at_ms: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    /// Every identity record standing for the same physical device as
    /// `value`, newest first. Relatedness follows alias edges one hop in
    /// each direction; longer chains are not resolved.
    pub fn evidence_history(
        &self,
        owner: &str,
        value: &str,
    ) -> Result<Vec<IdentityRecordRow>, StoreError> {
        let owner = canonicalize_owner(owner)?;
        let value = canonicalize_value(value)?;
        let aliases = self.alias_rows(&owner)?;
        let related = canonical::equivalence_set(&value, &aliases);

        let mut stmt = self.conn.prepare(
            "SELECT uuid, algorithm, value, submitted_by, created_at_ms \
             FROM identity_records WHERE owner=?1 \
             ORDER BY created_at_ms DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![owner], |row| {
            Ok(IdentityRecordRow {
                uuid: row.get(0)?,
                algorithm: row.get(1)?,
                value: row.get(2)?,
                submitted_by: row.get(3)?,
                created_at_ms: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            let row = row?;
            if related.contains(&row.value) {
                out.push(row);
            }
        }
        Ok(out)
    }
}

fn existing_value_tx(
    tx: &rusqlite::Transaction<'_>,
    algorithm: &str,
    uuid: &str,
) -> Result<Option<String>, StoreError> {
    Ok(tx
        .query_row(
            "SELECT value FROM identity_records WHERE algorithm=?1 AND uuid=?2",
            params![algorithm, uuid],
            |row| row.get::<_, String>(0),
        )
        .optional()?)
}
