use crate::config::AppConfig;
use crate::execution::trace::TRACE_FILE_NAME;
use crate::platform::secs_from_system_time;
use crate::storage::models::InventoryEntry;
use ahash::AHashSet;
use glob::Pattern;
use std::fs::Metadata;
use std::path::Path;
use tracing::error;
use walkdir::{DirEntry, WalkDir};

/// Exclusion rules applied while walking a root.
pub struct ScanFilter {
    allowed_exts: AHashSet<String>,
    excluded_names: AHashSet<String>,
    trash_path: String,
    ignore_patterns: Vec<Pattern>,
    index_file_name: String,
}

impl ScanFilter {
    pub fn from_config(config: &AppConfig) -> Self {
        let ignore_patterns = config
            .ignore_patterns
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            allowed_exts: config.extensions.iter().map(|e| e.to_lowercase()).collect(),
            excluded_names: config.exclude_dirs.iter().map(|d| d.to_lowercase()).collect(),
            trash_path: config.trash_folder.trim_end_matches('/').to_string(),
            ignore_patterns,
            index_file_name: Path::new(&config.db_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        }
    }

    fn is_in_trash(&self, path: &str) -> bool {
        !self.trash_path.is_empty()
            && (path == self.trash_path || path.starts_with(&format!("{}/", self.trash_path)))
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns.iter().any(|p| p.matches_path(path))
    }

    /// System (`$...`), hidden (`.…`) and blocklisted directories are never
    /// entered. The walk root itself is always entered.
    fn should_descend(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.starts_with('$') || name.starts_with('.') {
            return false;
        }
        if self.excluded_names.contains(&name) {
            return false;
        }
        let path = normalize(entry.path());
        !self.is_in_trash(&path) && !self.is_ignored(entry.path())
    }

    /// Hidden files, trace receipts and the index store's own files are
    /// bookkeeping, never media.
    fn is_bookkeeping(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        name.starts_with('.')
            || name == TRACE_FILE_NAME
            || (!self.index_file_name.is_empty() && name.starts_with(&self.index_file_name))
    }

    pub fn allows_extension(&self, ext: &str) -> bool {
        self.allowed_exts.is_empty() || self.allowed_exts.contains(ext)
    }
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Creation time where the platform records one, else modification time.
fn timestamps(metadata: &Metadata) -> (f64, f64) {
    let modified = metadata
        .modified()
        .map(secs_from_system_time)
        .unwrap_or(0.0);
    let created = metadata
        .created()
        .map(secs_from_system_time)
        .unwrap_or(modified);
    (created, modified)
}

/// Walk one root and hand every accepted file to `sink`. Unreadable entries
/// are logged and skipped. Returns the number of files accepted.
pub fn walk_root(
    root: &Path,
    filter: &ScanFilter,
    mut sink: impl FnMut(InventoryEntry) -> Result<(), crate::Error>,
) -> Result<usize, crate::Error> {
    let mut accepted = 0;
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| filter.should_descend(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                error!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = normalize(entry.path());
        if filter.is_bookkeeping(&entry.file_name().to_string_lossy())
            || filter.is_in_trash(&path)
            || filter.is_ignored(entry.path())
        {
            continue;
        }
        let extension = extension_of(entry.path());
        if !filter.allows_extension(&extension) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                error!("Error getting metadata for {}: {}", path, err);
                continue;
            }
        };
        let (created_at, modified_at) = timestamps(&metadata);

        sink(InventoryEntry {
            path,
            size: metadata.len(),
            extension,
            created_at,
            modified_at,
        })?;
        accepted += 1;
    }

    Ok(accepted)
}
