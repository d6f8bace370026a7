use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// Progress of a record through the fingerprinting funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashState {
    Unprocessed,
    /// Provably unique; no full hash needed.
    Skipped,
    Complete,
}

impl HashState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashState::Unprocessed => "UNPROCESSED",
            HashState::Skipped => "SKIPPED",
            HashState::Complete => "COMPLETE",
        }
    }
}

/// The judge's verdict for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    Keep,
    Delete,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Keep => "KEEP",
            Disposition::Delete => "DELETE",
        }
    }
}

impl ToSql for HashState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for HashState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "UNPROCESSED" => Ok(HashState::Unprocessed),
            "SKIPPED" => Ok(HashState::Skipped),
            "COMPLETE" => Ok(HashState::Complete),
            other => Err(FromSqlError::Other(
                format!("unknown hash_state '{}'", other).into(),
            )),
        }
    }
}

impl ToSql for Disposition {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Disposition {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "KEEP" => Ok(Disposition::Keep),
            "DELETE" => Ok(Disposition::Delete),
            other => Err(FromSqlError::Other(
                format!("unknown disposition '{}'", other).into(),
            )),
        }
    }
}

/// One discovered file, as produced by the inventory step.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryEntry {
    pub path: String,
    pub size: u64,
    pub extension: String,
    pub created_at: f64,
    pub modified_at: f64,
}

/// One indexed file. `path` is the natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub size: i64,
    pub extension: String,
    pub created_at: f64,
    pub modified_at: f64,
    pub hash_partial: Option<String>,
    pub hash_full: Option<String>,
    /// Perceptual hash slot. Never populated by this crate.
    pub phash: Option<String>,
    pub hash_state: HashState,
    pub has_exif_date: bool,
    pub metadata_score: i64,
    pub analyzed: bool,
    pub disposition: Option<Disposition>,
    pub target_path: Option<String>,
}

impl FileRecord {
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn parent_dir(&self) -> &str {
        self.path.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
    }
}

/// Disposition counts used by the consistency audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispositionCounts {
    pub total: i64,
    pub keeps: i64,
    pub deletes: i64,
    pub unset: i64,
    pub keeps_without_target: i64,
}
