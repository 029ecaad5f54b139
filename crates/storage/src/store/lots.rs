#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;

// Lot workflows live elsewhere; this is the minimal membership surface the
// unassigned listing needs.
impl SqliteStore {
    pub fn lot_member_add(&mut self, request: LotMemberRequest) -> Result<bool, StoreError> {
        let owner = canonicalize_owner(&request.owner)?;
        let value = canonicalize_value(&request.value)?;
        let lot = request.lot.trim().to_string();
        if lot.is_empty() {
            return Err(StoreError::InvalidInput("lot name must not be empty"));
        }

        let tx = self.conn.transaction()?;
        ensure_owner_tx(&tx, &owner, request.created_at_ms)?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO lot_members(owner, lot, value, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4)",
            params![owner, lot, value, request.created_at_ms],
        )?;
        tx.commit()?;
        Ok(inserted > 0)
    }

    pub fn lot_member_remove(
        &mut self,
        owner: &str,
        lot: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        let owner = canonicalize_owner(owner)?;
        let value = canonicalize_value(value)?;

        let tx = self.conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM lot_members WHERE owner=?1 AND lot=?2 AND value=?3",
            params![owner, lot.trim(), value],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Distinct identity values grouped under any lot for this owner.
    pub fn lot_member_values(&self, owner: &str) -> Result<BTreeSet<String>, StoreError> {
        let owner = canonicalize_owner(owner)?;
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT value FROM lot_members WHERE owner=?1")?;
        let mut rows = stmt.query(params![owner])?;
        let mut out = BTreeSet::new();
        while let Some(row) = rows.next()? {
            out.insert(row.get::<_, String>(0)?);
        }
        Ok(out)
    }
}
