use super::models::*;
use super::sqlite::Database;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

const RECORD_COLUMNS: &str = "id, file_path, file_size, file_ext, created_at, modified_at, \
     hash_partial, hash_full, phash, hash_state, has_exif_date, metadata_score, analyzed, \
     disposition, target_path";

fn map_record(row: &Row<'_>) -> Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        size: row.get(2)?,
        extension: row.get(3)?,
        created_at: row.get(4)?,
        modified_at: row.get(5)?,
        hash_partial: row.get(6)?,
        hash_full: row.get(7)?,
        phash: row.get(8)?,
        hash_state: row.get(9)?,
        has_exif_date: row.get(10)?,
        metadata_score: row.get(11)?,
        analyzed: row.get(12)?,
        disposition: row.get(13)?,
        target_path: row.get(14)?,
    })
}

impl Database {
    // ── Inventory ────────────────────────────────────────────────

    /// Insert discovered files in one transaction. Paths already present are
    /// ignored, so overlapping scans never create duplicate records.
    pub fn insert_inventory(&self, entries: &[InventoryEntry]) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO media_file \
                 (file_path, file_size, file_ext, created_at, modified_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for entry in entries {
                count += stmt.execute(params![
                    entry.path,
                    entry.size as i64,
                    entry.extension,
                    entry.created_at,
                    entry.modified_at,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Inserted {} of {} inventory entries", count, entries.len());
        Ok(count)
    }

    pub fn count_records(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM media_file", [], |row| row.get(0))
    }

    pub fn get_record(&self, id: i64) -> Result<Option<FileRecord>> {
        self.connection()
            .query_row(
                &format!("SELECT {} FROM media_file WHERE id = ?1", RECORD_COLUMNS),
                params![id],
                map_record,
            )
            .optional()
    }

    pub fn get_record_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        self.connection()
            .query_row(
                &format!("SELECT {} FROM media_file WHERE file_path = ?1", RECORD_COLUMNS),
                params![path],
                map_record,
            )
            .optional()
    }

    pub fn all_records(&self) -> Result<Vec<FileRecord>> {
        self.query_records("1 = 1 ORDER BY id", [])
    }

    fn query_records<P: rusqlite::Params>(
        &self,
        where_clause: &str,
        params: P,
    ) -> Result<Vec<FileRecord>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM media_file WHERE {}",
            RECORD_COLUMNS, where_clause
        ))?;
        let records = stmt
            .query_map(params, map_record)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    // ── Fingerprinting ───────────────────────────────────────────

    /// Funnel stage 1: a size nobody else has cannot be a duplicate.
    pub fn mark_unique_sizes(&self) -> Result<usize> {
        self.connection().execute(
            "UPDATE media_file SET hash_state = 'SKIPPED' \
             WHERE hash_state = 'UNPROCESSED' AND file_size IN ( \
                 SELECT file_size FROM media_file \
                 GROUP BY file_size HAVING COUNT(*) = 1)",
            [],
        )
    }

    /// Records sharing a size that still need a partial hash: (id, path, size).
    pub fn partial_hash_candidates(&self) -> Result<Vec<(i64, String, i64)>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, file_path, file_size FROM media_file \
             WHERE hash_state = 'UNPROCESSED' AND hash_partial IS NULL \
             AND file_size IN ( \
                 SELECT file_size FROM media_file \
                 GROUP BY file_size HAVING COUNT(*) > 1) \
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn set_partial_hashes(&self, updates: &[(i64, String)]) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt =
                tx.prepare_cached("UPDATE media_file SET hash_partial = ?1 WHERE id = ?2")?;
            for (id, hash) in updates {
                count += stmt.execute(params![hash, id])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Funnel stage 3: a (size, partial hash) pair with one member is unique.
    /// Group membership counts every record, so a record left unhashed by a
    /// failed read still pairs with siblings that completed earlier.
    pub fn mark_unique_partials(&self) -> Result<usize> {
        self.connection().execute(
            "UPDATE media_file SET hash_state = 'SKIPPED' \
             WHERE hash_state = 'UNPROCESSED' AND id IN ( \
                 SELECT MIN(id) FROM media_file \
                 WHERE hash_partial IS NOT NULL \
                 GROUP BY file_size, hash_partial HAVING COUNT(*) = 1)",
            [],
        )
    }

    /// Records in a shared (size, partial hash) group without a full hash:
    /// (id, path, size, partial hash).
    pub fn full_hash_candidates(&self) -> Result<Vec<(i64, String, i64, String)>> {
        let mut stmt = self.connection().prepare(
            "SELECT m.id, m.file_path, m.file_size, m.hash_partial FROM media_file m \
             JOIN ( \
                 SELECT file_size, hash_partial FROM media_file \
                 WHERE hash_partial IS NOT NULL \
                 GROUP BY file_size, hash_partial HAVING COUNT(*) > 1 \
             ) g ON g.file_size = m.file_size AND g.hash_partial = m.hash_partial \
             WHERE m.hash_full IS NULL AND m.hash_state = 'UNPROCESSED' \
             ORDER BY m.id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Store full hashes and mark the records complete.
    pub fn set_full_hashes(&self, updates: &[(i64, String)]) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE media_file SET hash_full = ?1, hash_state = 'COMPLETE' WHERE id = ?2",
            )?;
            for (id, hash) in updates {
                count += stmt.execute(params![hash, id])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    // ── Metadata ─────────────────────────────────────────────────

    /// Unanalyzed records whose extension is one of `extensions`: (id, path).
    pub fn unanalyzed_records(&self, extensions: &[&str]) -> Result<Vec<(i64, String)>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT id, file_path, file_ext FROM media_file WHERE analyzed = 0 ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows
            .into_iter()
            .filter(|(_, _, ext)| extensions.contains(&ext.as_str()))
            .map(|(id, path, _)| (id, path))
            .collect())
    }

    /// Each update is (id, has capture date, score).
    pub fn set_metadata_scores(&self, updates: &[(i64, bool, i64)]) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE media_file SET has_exif_date = ?1, metadata_score = ?2, analyzed = 1 \
                 WHERE id = ?3",
            )?;
            for (id, has_date, score) in updates {
                count += stmt.execute(params![has_date, score, id])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    // ── Judgment ─────────────────────────────────────────────────

    /// Full hashes shared by more than one record.
    pub fn duplicate_hashes(&self) -> Result<Vec<String>> {
        let mut stmt = self.connection().prepare(
            "SELECT hash_full FROM media_file WHERE hash_full IS NOT NULL \
             GROUP BY hash_full HAVING COUNT(*) > 1 ORDER BY hash_full",
        )?;
        let hashes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>>>()?;
        Ok(hashes)
    }

    pub fn records_with_hash(&self, hash_full: &str) -> Result<Vec<FileRecord>> {
        self.query_records("hash_full = ?1 ORDER BY id", params![hash_full])
    }

    pub fn set_dispositions(&self, updates: &[(i64, Disposition)]) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt =
                tx.prepare_cached("UPDATE media_file SET disposition = ?1 WHERE id = ?2")?;
            for (id, disposition) in updates {
                count += stmt.execute(params![disposition, id])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Close the disposition invariant: everything not judged is a keeper.
    pub fn keep_all_unset(&self) -> Result<usize> {
        self.connection().execute(
            "UPDATE media_file SET disposition = 'KEEP' WHERE disposition IS NULL",
            [],
        )
    }

    // ── Planning ─────────────────────────────────────────────────

    /// KEEP records, those already under `target_root` first so they hold on
    /// to their current paths when re-planned.
    pub fn keep_records(&self, target_root: &str) -> Result<Vec<FileRecord>> {
        let prefix = format!("{}/", target_root.trim_end_matches('/'));
        self.query_records(
            "disposition = 'KEEP' \
             ORDER BY CASE WHEN substr(file_path, 1, length(?1)) = ?1 THEN 0 ELSE 1 END, id",
            params![prefix],
        )
    }

    /// Current paths under `target_root` of records that will not stay put.
    pub fn deleted_paths_under(&self, target_root: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", target_root.trim_end_matches('/'));
        let mut stmt = self.connection().prepare(
            "SELECT file_path FROM media_file \
             WHERE disposition = 'DELETE' AND substr(file_path, 1, length(?1)) = ?1 \
             ORDER BY id",
        )?;
        let paths = stmt
            .query_map(params![prefix], |row| row.get(0))?
            .collect::<Result<Vec<_>>>()?;
        Ok(paths)
    }

    pub fn set_target_paths(&self, updates: &[(i64, String)]) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt =
                tx.prepare_cached("UPDATE media_file SET target_path = ?1 WHERE id = ?2")?;
            for (id, target) in updates {
                count += stmt.execute(params![target, id])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    // ── Audit ────────────────────────────────────────────────────

    pub fn disposition_counts(&self) -> Result<DispositionCounts> {
        self.connection().query_row(
            "SELECT COUNT(*), \
                    COALESCE(SUM(disposition = 'KEEP'), 0), \
                    COALESCE(SUM(disposition = 'DELETE'), 0), \
                    COALESCE(SUM(disposition IS NULL), 0), \
                    COALESCE(SUM(disposition = 'KEEP' AND target_path IS NULL), 0) \
             FROM media_file",
            [],
            |row| {
                Ok(DispositionCounts {
                    total: row.get(0)?,
                    keeps: row.get(1)?,
                    deletes: row.get(2)?,
                    unset: row.get(3)?,
                    keeps_without_target: row.get(4)?,
                })
            },
        )
    }

    // ── Execution / Undo ─────────────────────────────────────────

    pub fn keepers_with_target(&self) -> Result<Vec<FileRecord>> {
        self.query_records(
            "disposition = 'KEEP' AND target_path IS NOT NULL ORDER BY id",
            [],
        )
    }

    pub fn delete_records(&self) -> Result<Vec<FileRecord>> {
        self.query_records("disposition = 'DELETE' ORDER BY id", [])
    }

    /// DELETE records paired with the planned destination of the keeper
    /// sharing their full hash, if there is one.
    pub fn deletes_with_winner(&self) -> Result<Vec<(FileRecord, Option<String>)>> {
        let columns = RECORD_COLUMNS
            .split(", ")
            .map(|c| format!("t1.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {}, t2.target_path FROM media_file t1 \
             LEFT JOIN media_file t2 \
                 ON t1.hash_full = t2.hash_full AND t2.disposition = 'KEEP' \
             WHERE t1.disposition = 'DELETE' ORDER BY t1.id",
            columns
        ))?;
        let rows = stmt
            .query_map([], |row| Ok((map_record(row)?, row.get(15)?)))?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows)
    }
}
