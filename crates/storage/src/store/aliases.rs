#![forbid(unsafe_code)]

use super::*;
use dh_core::canonical;
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    /// Declare `alias` superseded by `root` within the owner scope. Only one
    /// active alias relationship per value at a time: a second declaration
    /// for the same alias fails with `AliasConflict` until the first edge is
    /// retired out of band.
    pub fn create_alias(
        &mut self,
        request: CreateAliasRequest,
    ) -> Result<AliasEdgeRow, StoreError> {
        let owner = canonicalize_owner(&request.owner)?;
        let alias = canonicalize_value(&request.alias)?;
        let root = canonicalize_value(&request.root)?;
        if alias == root {
            return Err(StoreError::SelfAlias);
        }

        let tx = self.conn.transaction()?;
        ensure_owner_tx(&tx, &owner, request.created_at_ms)?;

        let existing_root = tx
            .query_row(
                "SELECT root FROM alias_edges WHERE owner=?1 AND alias=?2 ORDER BY id ASC LIMIT 1",
                params![owner, alias],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        if let Some(existing_root) = existing_root {
            return Err(StoreError::AliasConflict {
                alias,
                existing_root,
            });
        }

        tx.execute(
            "INSERT INTO alias_edges(owner, alias, root, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![owner, alias, root, request.created_at_ms],
        )?;
        let seq = tx.last_insert_rowid();
        tx.commit()?;

        Ok(AliasEdgeRow {
            seq,
            alias,
            root,
            created_at_ms: request.created_at_ms,
        })
    }

    pub fn list_aliases(&self, owner: &str) -> Result<Vec<AliasEdgeRow>, StoreError> {
        let owner = canonicalize_owner(owner)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, alias, root, created_at_ms FROM alias_edges \
             WHERE owner=?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![owner], |row| {
            Ok(AliasEdgeRow {
                seq: row.get(0)?,
                alias: row.get(1)?,
                root: row.get(2)?,
                created_at_ms: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Owner's alias edges in declaration order, shaped for the set algebra.
    pub(in crate::store) fn alias_rows(
        &self,
        owner: &str,
    ) -> Result<Vec<canonical::AliasRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, alias, root FROM alias_edges WHERE owner=?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![owner], |row| {
            Ok(canonical::AliasRow {
                seq: row.get(0)?,
                alias: row.get(1)?,
                root: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
