#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;

// Window-function rendition of the device listing. The primary listing path
// resolves aliases in memory; this one pushes the same set exclusions into
// SQL so the two can be cross-checked over the same database. Results are
// unordered sets: recency ordering stays with the primary path.
//
// Reading order of the nested exclusions, innermost first:
//   1. roots that have no identity record of their own (virtual roots)
//   2. the earliest-declared alias of each virtual root (its representative)
//   3. every alias value except those representatives (superseded)
//   4. distinct identity values minus the superseded set
const CANONICAL_VALUES_SQL: &str = r#"
SELECT DISTINCT sp.value FROM identity_records AS sp
WHERE sp.owner = ?1
  AND sp.value NOT IN (
    SELECT DISTINCT ali.alias FROM alias_edges AS ali
    WHERE ali.owner = ?1
      AND ali.alias NOT IN (
        SELECT alias FROM (
          SELECT alias, root, ROW_NUMBER() OVER (
            PARTITION BY root ORDER BY id ASC
          ) AS row_num
          FROM alias_edges
          WHERE owner = ?1
        ) AS ranked
        WHERE row_num = 1
          AND root IN (
            SELECT DISTINCT al.root FROM alias_edges AS al
            WHERE al.owner = ?1
              AND NOT EXISTS (
                SELECT 1 FROM identity_records AS ir
                WHERE ir.owner = ?1 AND ir.value = al.root
              )
          )
      )
  )
"#;

// Steps 1-4 as above, then three more exclusions for lot membership: the
// member values themselves, every root an edge ties to a member, and every
// alias of such a root.
const UNASSIGNED_VALUES_SQL: &str = r#"
SELECT DISTINCT sp.value FROM identity_records AS sp
WHERE sp.owner = ?1
  AND sp.value NOT IN (
    SELECT DISTINCT ali.alias FROM alias_edges AS ali
    WHERE ali.owner = ?1
      AND ali.alias NOT IN (
        SELECT alias FROM (
          SELECT alias, root, ROW_NUMBER() OVER (
            PARTITION BY root ORDER BY id ASC
          ) AS row_num
          FROM alias_edges
          WHERE owner = ?1
        ) AS ranked
        WHERE row_num = 1
          AND root IN (
            SELECT DISTINCT al.root FROM alias_edges AS al
            WHERE al.owner = ?1
              AND NOT EXISTS (
                SELECT 1 FROM identity_records AS ir
                WHERE ir.owner = ?1 AND ir.value = al.root
              )
          )
      )
  )
  AND sp.value NOT IN (
    SELECT value FROM lot_members WHERE owner = ?1
  )
  AND sp.value NOT IN (
    SELECT ae.alias FROM alias_edges AS ae
    WHERE ae.owner = ?1
      AND ae.root IN (
        SELECT DISTINCT ra.root FROM alias_edges AS ra
        WHERE ra.owner = ?1
          AND (ra.alias IN (SELECT value FROM lot_members WHERE owner = ?1)
            OR ra.root IN (SELECT value FROM lot_members WHERE owner = ?1))
      )
  )
  AND sp.value NOT IN (
    SELECT ae.root FROM alias_edges AS ae
    WHERE ae.owner = ?1
      AND ae.root IN (
        SELECT DISTINCT ra.root FROM alias_edges AS ra
        WHERE ra.owner = ?1
          AND (ra.alias IN (SELECT value FROM lot_members WHERE owner = ?1)
            OR ra.root IN (SELECT value FROM lot_members WHERE owner = ?1))
      )
  )
"#;

impl SqliteStore {
    /// Canonical device values for an owner, computed entirely in SQL.
    pub fn list_device_values_sql(&self, owner: &str) -> Result<BTreeSet<String>, StoreError> {
        let owner = canonicalize_owner(owner)?;
        self.query_value_set(CANONICAL_VALUES_SQL, &owner)
    }

    /// Canonical device values outside every lot, computed entirely in SQL.
    pub fn list_unassigned_values_sql(&self, owner: &str) -> Result<BTreeSet<String>, StoreError> {
        let owner = canonicalize_owner(owner)?;
        self.query_value_set(UNASSIGNED_VALUES_SQL, &owner)
    }

    fn query_value_set(&self, sql: &str, owner: &str) -> Result<BTreeSet<String>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params![owner])?;
        let mut out = BTreeSet::new();
        while let Some(row) = rows.next()? {
            out.insert(row.get::<_, String>(0)?);
        }
        Ok(out)
    }
}
