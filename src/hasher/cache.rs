use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const CACHE_FILE_NAME: &str = ".media_hash_cache.db";

const BUSY_RETRIES: u32 = 5;
const BUSY_BACKOFF: Duration = Duration::from_millis(200);

/// Durable memo of full hashes, keyed by (file size, partial hash).
///
/// Lives under the target root so it travels with the library. A
/// connection is opened for every lookup or write and closed right after,
/// so no lock is held across pipeline stages. Another process holding the
/// file is handled by retrying on `SQLITE_BUSY`.
pub struct HashCache {
    path: PathBuf,
}

impl HashCache {
    /// Open (and create if needed) the cache at `path`. When the parent
    /// directory cannot be created the cache falls back to the working
    /// directory.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let mut path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && fs::create_dir_all(parent).is_err() {
                warn!(
                    "Cannot create '{}', using working directory for hash cache",
                    parent.display()
                );
                path = PathBuf::from(CACHE_FILE_NAME);
            }
        }
        let cache = HashCache { path };
        cache.with_connection(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS hash_cache (
                     file_size    INTEGER NOT NULL,
                     hash_partial TEXT NOT NULL,
                     hash_full    TEXT NOT NULL,
                     last_seen    INTEGER NOT NULL,
                     PRIMARY KEY (file_size, hash_partial)
                 );",
            )
        })?;
        debug!("Using '{}' for hash cache", cache.path.display());
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_connection<T>(
        &self,
        op: impl Fn(&Connection) -> rusqlite::Result<T>,
    ) -> rusqlite::Result<T> {
        let mut attempt = 0;
        loop {
            let result = Connection::open(&self.path).and_then(|conn| {
                conn.busy_timeout(Duration::from_secs(5))?;
                op(&conn)
            });
            match result {
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
                        && attempt < BUSY_RETRIES =>
                {
                    attempt += 1;
                    trace!("Hash cache busy, retry {}", attempt);
                    thread::sleep(BUSY_BACKOFF * attempt);
                }
                other => return other,
            }
        }
    }

    pub fn get_full_hash(&self, file_size: i64, hash_partial: &str) -> rusqlite::Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT hash_full FROM hash_cache WHERE file_size = ?1 AND hash_partial = ?2",
                params![file_size, hash_partial],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Insert or refresh an entry, stamping it with the current time.
    pub fn put_full_hash(
        &self,
        file_size: i64,
        hash_partial: &str,
        hash_full: &str,
    ) -> rusqlite::Result<()> {
        let now = chrono::Utc::now().timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO hash_cache (file_size, hash_partial, hash_full, last_seen) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![file_size, hash_partial, hash_full, now],
            )
            .map(|_| ())
        })
    }

    pub fn count(&self) -> rusqlite::Result<i64> {
        self.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM hash_cache", [], |row| row.get(0))
        })
    }
}
