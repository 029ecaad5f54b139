#![forbid(unsafe_code)]

use super::*;
use dh_core::canonical;
use rusqlite::params;

impl SqliteStore {
    /// Canonical device listing for an owner: one identity value per logical
    /// device, most recently recorded first. The page window is applied only
    /// after the full set is resolved, so `total` and the ordering stay
    /// correct regardless of offset.
    pub fn list_devices(&self, request: ListDevicesRequest) -> Result<DevicePage, StoreError> {
        let owner = canonicalize_owner(&request.owner)?;
        let identities = self.identity_rows(&owner)?;
        let aliases = self.alias_rows(&owner)?;
        let values = canonical::canonical_values(&identities, &aliases);
        Ok(paginate(values, request.offset, request.limit))
    }

    /// Same listing minus every value grouped under a lot, including the
    /// alias/root counterparts a lot member drags along.
    pub fn list_unassigned_devices(
        &self,
        request: ListDevicesRequest,
    ) -> Result<DevicePage, StoreError> {
        let owner = canonicalize_owner(&request.owner)?;
        let identities = self.identity_rows(&owner)?;
        let aliases = self.alias_rows(&owner)?;
        let lots = self.lot_member_values(&owner)?;
        let values = canonical::unassigned_values(&identities, &aliases, &lots);
        Ok(paginate(values, request.offset, request.limit))
    }

    pub(in crate::store) fn identity_rows(
        &self,
        owner: &str,
    ) -> Result<Vec<canonical::IdentityRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT value, created_at_ms FROM identity_records WHERE owner=?1 ORDER BY id ASC",
        )?;
        let mut rows = stmt.query(params![owner])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(canonical::IdentityRow {
                value: row.get(0)?,
                created_at_ms: row.get(1)?,
            });
        }
        Ok(out)
    }
}

fn paginate(values: Vec<String>, offset: usize, limit: usize) -> DevicePage {
    let total = values.len();
    let values = values.into_iter().skip(offset).take(limit).collect();
    DevicePage { values, total }
}
