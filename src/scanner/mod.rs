pub mod walk;

use crate::config::AppConfig;
use crate::error::Error;
use crate::progress::{ProgressReporter, Stage};
use crate::storage::models::InventoryEntry;
use crate::storage::Database;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};
use walk::ScanFilter;

/// Index every accepted file under `roots`, flushing to the store in
/// batches of `config.batch_size`. Returns the number of new records.
pub fn scan_roots(
    config: &AppConfig,
    roots: &[String],
    db: &Database,
    reporter: &dyn ProgressReporter,
) -> Result<usize, Error> {
    let filter = ScanFilter::from_config(config);
    let start = Instant::now();
    reporter.on_stage_start(Stage::Inventory, None);

    let mut inserted = 0usize;
    let mut seen = 0usize;
    let mut buffer: Vec<InventoryEntry> = Vec::with_capacity(config.batch_size);

    for root in roots {
        let root_path = Path::new(root);
        if !root_path.exists() {
            warn!("Path not found: {}", root);
            continue;
        }
        info!("Scanning: {}", root);

        walk::walk_root(root_path, &filter, |entry| {
            buffer.push(entry);
            seen += 1;
            if buffer.len() >= config.batch_size {
                inserted += db.insert_inventory(&buffer)?;
                buffer.clear();
                reporter.on_stage_progress(Stage::Inventory, seen);
            }
            Ok(())
        })?;
    }
    inserted += db.insert_inventory(&buffer)?;

    reporter.on_stage_complete(Stage::Inventory, inserted, start.elapsed().as_secs_f64());
    info!("File scan complete. Indexed {} files", inserted);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use std::fs;

    #[test]
    fn test_scan_applies_exclusions() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        let root_str = root.to_string_lossy().replace('\\', "/");
        for rel in [
            "keep/a.JPG",
            "keep/b.txt",
            "keep/.hidden.jpg",
            "keep/media_trace.txt",
            ".git/c.jpg",
            "$RECYCLE.BIN/d.jpg",
            "node_modules/e.jpg",
            "trash/f.jpg",
            "skipme/g.jpg",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, rel).unwrap();
        }

        let mut config = AppConfig::new(&format!("{}/lib", root_str), &format!("{}/trash", root_str));
        config.extensions = vec![".jpg".to_string()];
        config.exclude_dirs = vec!["Node_Modules".to_string()];
        config.ignore_patterns = vec!["*skipme".to_string()];

        let db = Database::open_in_memory().unwrap();
        let inserted = scan_roots(&config, &[root_str.clone()], &db, &SilentReporter).unwrap();

        assert_eq!(inserted, 1);
        let record = db
            .get_record_by_path(&format!("{}/keep/a.JPG", root_str))
            .unwrap()
            .unwrap();
        assert_eq!(record.extension, ".jpg");
        assert_eq!(record.size, "keep/a.JPG".len() as i64);
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let config = AppConfig::new("/lib", "/trash");
        let db = Database::open_in_memory().unwrap();
        let inserted = scan_roots(
            &config,
            &["/definitely/not/here".to_string()],
            &db,
            &SilentReporter,
        )
        .unwrap();
        assert_eq!(inserted, 0);
    }
}
