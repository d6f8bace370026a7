use super::executor::Executor;
use super::{move_file, same_location};
use crate::error::Error;
use crate::progress::{ProgressReporter, Stage};
use crate::storage::Database;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UndoReport {
    pub dry_run: bool,
    pub keepers_total: usize,
    pub keepers_restored: usize,
    pub deletes_total: usize,
    pub deletes_restored: usize,
    /// Restorations planned but not performed (dry run).
    pub planned: usize,
    /// Original location is occupied; the file was left where it is.
    pub refused: usize,
    /// Nothing found at the moved-to location.
    pub missing: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Restore {
    Restored,
    Planned,
    InPlace,
    Refused,
    Missing,
    Failed,
}

/// Reverse the moves recorded in the index by the previous run.
///
/// Keepers go from `target_path` back to `path`; trashed duplicates go from
/// `{trash_root}/{id}_{file name}` back to `path`. A restoration never
/// overwrites an existing file. Only valid until the index is rebuilt.
pub fn undo(
    db: &Database,
    trash_root: &str,
    dry_run: bool,
    reporter: &dyn ProgressReporter,
) -> Result<UndoReport, Error> {
    info!("Starting undo. Mode: {}", if dry_run { "DRY RUN" } else { "LIVE" });
    let start = Instant::now();

    let keepers = db.keepers_with_target()?;
    let deletes = db.delete_records()?;
    reporter.on_stage_start(Stage::Undo, Some(keepers.len() + deletes.len()));

    let mut report = UndoReport {
        dry_run,
        keepers_total: keepers.len(),
        deletes_total: deletes.len(),
        ..Default::default()
    };

    let mut done = 0;
    for record in &keepers {
        done += 1;
        reporter.on_stage_progress(Stage::Undo, done);
        let Some(target) = record.target_path.as_deref() else {
            continue;
        };
        if tally(&mut report, restore(target, &record.path, dry_run)) {
            report.keepers_restored += 1;
        }
    }

    for record in &deletes {
        done += 1;
        reporter.on_stage_progress(Stage::Undo, done);
        let trashed = Executor::trash_path_for(trash_root, record);
        if tally(&mut report, restore(&trashed, &record.path, dry_run)) {
            report.deletes_restored += 1;
        }
    }

    reporter.on_stage_complete(
        Stage::Undo,
        report.keepers_restored + report.deletes_restored,
        start.elapsed().as_secs_f64(),
    );
    info!(
        "Undo complete: {}/{} keepers, {}/{} duplicates restored, {} refused, {} missing",
        report.keepers_restored,
        report.keepers_total,
        report.deletes_restored,
        report.deletes_total,
        report.refused,
        report.missing
    );
    Ok(report)
}

/// Returns true when the file was actually put back.
fn tally(report: &mut UndoReport, outcome: Restore) -> bool {
    match outcome {
        Restore::Restored => return true,
        Restore::Planned => report.planned += 1,
        Restore::InPlace => {}
        Restore::Refused => report.refused += 1,
        Restore::Missing => report.missing += 1,
        Restore::Failed => report.failed += 1,
    }
    false
}

fn restore(current: &str, original: &str, dry_run: bool) -> Restore {
    let (from, to) = (Path::new(current), Path::new(original));

    if same_location(from, to) {
        debug!("Nothing to undo, file never moved: {}", original);
        return Restore::InPlace;
    }
    if !from.exists() {
        warn!("Cannot restore '{}': nothing at '{}'", original, current);
        return Restore::Missing;
    }
    if to.exists() {
        warn!("Refusing to restore over existing file: {}", original);
        return Restore::Refused;
    }
    if dry_run {
        info!("[DRY] Restore: '{}' -> '{}'", current, original);
        return Restore::Planned;
    }
    match move_file(from, to) {
        Ok(()) => {
            debug!("Restored: '{}' -> '{}'", current, original);
            Restore::Restored
        }
        Err(e) => {
            error!("Restore failed: {} -> {} | Error: {}", current, original, e);
            Restore::Failed
        }
    }
}
