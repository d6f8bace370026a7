use rusqlite::{Connection, Result};
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

/// The per-run index of file records.
///
/// Every inventory run wipes it and rebuilds from a fresh scan; only the
/// hash cache outlives a run.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 64MB cache)");
        Ok(())
    }

    /// Older schemas are dropped rather than migrated; the index is rebuilt
    /// from the filesystem anyway.
    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            debug!("Schema version {} < {}, recreating", version, SCHEMA_VERSION);
            self.conn.execute_batch("DROP TABLE IF EXISTS media_file;")?;
        }

        self.conn.execute_batch(include_str!("schema.sql"))?;
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;
        debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drop every record, including the id sequence, so a new run starts
    /// from an empty index.
    pub fn wipe(&self) -> Result<()> {
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS media_file;
             DELETE FROM sqlite_sequence WHERE name = 'media_file';",
        )?;
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("Index store wiped");
        Ok(())
    }

    /// Make the next record id `last_id + 1`. Trash names carry record ids,
    /// so a fresh index must not hand out ids an earlier run already used.
    pub fn reserve_ids_through(&self, last_id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM sqlite_sequence WHERE name = 'media_file'", [])?;
        tx.execute(
            "INSERT INTO sqlite_sequence (name, seq) VALUES ('media_file', ?1)",
            rusqlite::params![last_id],
        )?;
        tx.commit()?;
        debug!("Record ids continue after {}", last_id);
        Ok(())
    }
}
