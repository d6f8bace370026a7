use crate::error::Error;
use crate::progress::{ProgressReporter, Stage};
use crate::storage::models::{Disposition, FileRecord};
use crate::storage::Database;
use crate::timestamp::resolve_effective_timestamp;
use std::cmp::Ordering;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JudgeStats {
    pub duplicate_sets: usize,
    pub deleted: usize,
    pub kept_by_default: usize,
}

/// Names that look like copies ("Copy of x", "x (1)") lose ties.
pub fn has_copy_marker(file_name: &str) -> bool {
    file_name.to_lowercase().contains("copy") || file_name.contains('(')
}

/// Total order over duplicate candidates; the smallest is the keeper.
///
/// Higher metadata score, then older effective date, then a clean name,
/// then a shorter path.
pub fn compare_candidates(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.metadata_score
        .cmp(&a.metadata_score)
        .then_with(|| {
            let da = resolve_effective_timestamp(a.created_at, a.modified_at);
            let db = resolve_effective_timestamp(b.created_at, b.modified_at);
            da.total_cmp(&db)
        })
        .then_with(|| has_copy_marker(a.file_name()).cmp(&has_copy_marker(b.file_name())))
        .then_with(|| a.path.chars().count().cmp(&b.path.chars().count()))
}

/// Pick one keeper for a duplicate set; every other member is deleted.
pub fn judge_group(mut candidates: Vec<FileRecord>) -> Vec<(i64, Disposition)> {
    candidates.sort_by(compare_candidates);
    candidates
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let verdict = if i == 0 {
                Disposition::Keep
            } else {
                Disposition::Delete
            };
            (r.id, verdict)
        })
        .collect()
}

/// Judge every duplicate set, then mark everything left as KEEP so no
/// record leaves this stage without a disposition.
pub fn judge_duplicates(db: &Database, reporter: &dyn ProgressReporter) -> Result<JudgeStats, Error> {
    info!("Judging files...");
    let start = Instant::now();
    let hashes = db.duplicate_hashes()?;
    info!("Found {} sets of duplicates", hashes.len());
    reporter.on_stage_start(Stage::Judge, Some(hashes.len()));

    let mut stats = JudgeStats {
        duplicate_sets: hashes.len(),
        ..Default::default()
    };
    let mut updates = Vec::new();
    for (done, hash) in hashes.iter().enumerate() {
        let group = db.records_with_hash(hash)?;
        let verdicts = judge_group(group);
        if let Some((winner, _)) = verdicts.first() {
            debug!("Set {}: keeping record {} of {}", hash, winner, verdicts.len());
        }
        stats.deleted += verdicts
            .iter()
            .filter(|(_, d)| *d == Disposition::Delete)
            .count();
        updates.extend(verdicts);
        reporter.on_stage_progress(Stage::Judge, done + 1);
    }
    db.set_dispositions(&updates)?;
    stats.kept_by_default = db.keep_all_unset()?;

    reporter.on_stage_complete(Stage::Judge, stats.duplicate_sets, start.elapsed().as_secs_f64());
    info!(
        "{} duplicates marked for trash, {} unique files kept",
        stats.deleted, stats.kept_by_default
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_copy_marker() {
        assert!(has_copy_marker("Copy of Vacation.jpg"));
        assert!(has_copy_marker("vacation - COPY.jpg"));
        assert!(has_copy_marker("Vacation (1).jpg"));
        assert!(!has_copy_marker("Vacation.jpg"));
    }
}
