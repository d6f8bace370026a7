use super::trace::TraceBuffer;
use super::{move_file, same_location};
use crate::error::Error;
use crate::platform::{self, CreationTimeSetter, NativeCreationTime};
use crate::progress::{ProgressReporter, Stage};
use crate::storage::models::FileRecord;
use crate::storage::Database;
use crate::timestamp::{apply_jitter_if_midnight, resolve_effective_timestamp};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// What happened to one attempted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Dry run: the move was only logged.
    Planned,
    /// Source and destination are the same file.
    AlreadyInPlace,
    SourceMissing,
    Failed,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub dry_run: bool,
    pub moved: usize,
    pub planned: usize,
    pub already_in_place: usize,
    pub missing_sources: usize,
    pub failed: usize,
    pub consolidated: usize,
    pub trashed_without_keeper: usize,
    pub trace_folders: usize,
}

impl ExecutionReport {
    fn count(&mut self, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::Moved => self.moved += 1,
            MoveOutcome::Planned => self.planned += 1,
            MoveOutcome::AlreadyInPlace => self.already_in_place += 1,
            MoveOutcome::SourceMissing => self.missing_sources += 1,
            MoveOutcome::Failed => self.failed += 1,
        }
    }
}

/// Physically reorganizes files according to the plan in the index.
///
/// Keepers move to their target paths, duplicates move into the trash root
/// as `{id}_{file name}`. Nothing is ever deleted outright. Each move is its
/// own unit of work: a failure is logged and the run carries on.
pub struct Executor<'a> {
    db: &'a Database,
    trash_root: String,
    dry_run: bool,
    creation_time: Box<dyn CreationTimeSetter + 'a>,
    receipts: TraceBuffer,
}

impl<'a> Executor<'a> {
    pub fn new(db: &'a Database, trash_root: &str, dry_run: bool) -> Self {
        Self {
            db,
            trash_root: trash_root.trim_end_matches('/').to_string(),
            dry_run,
            creation_time: Box::new(NativeCreationTime),
            receipts: TraceBuffer::new(),
        }
    }

    pub fn with_creation_time_setter(mut self, setter: impl CreationTimeSetter + 'a) -> Self {
        self.creation_time = Box::new(setter);
        self
    }

    pub fn trash_path_for(trash_root: &str, record: &FileRecord) -> String {
        format!(
            "{}/{}_{}",
            trash_root.trim_end_matches('/'),
            record.id,
            record.file_name()
        )
    }

    /// Highest record id found as a `{id}_` prefix in the trash root, or 0
    /// when the trash root is empty or missing.
    pub fn highest_trash_id(trash_root: &str) -> io::Result<i64> {
        let entries = match fs::read_dir(trash_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut highest = 0;
        for entry in entries {
            let name = entry?.file_name();
            let id = name
                .to_string_lossy()
                .split_once('_')
                .and_then(|(prefix, _)| prefix.parse::<i64>().ok());
            if let Some(id) = id {
                highest = highest.max(id);
            }
        }
        Ok(highest)
    }

    pub fn execute(mut self, reporter: &dyn ProgressReporter) -> Result<ExecutionReport, Error> {
        let mode = if self.dry_run { "DRY RUN" } else { "LIVE" };
        info!("Starting execution phase. Mode: {}", mode);
        let start = Instant::now();

        let keepers = self.db.keepers_with_target()?;
        let deletes = self.db.deletes_with_winner()?;
        reporter.on_stage_start(Stage::Execute, Some(keepers.len() + deletes.len()));

        let mut report = ExecutionReport {
            dry_run: self.dry_run,
            ..Default::default()
        };
        self.process_keepers(&keepers, &mut report, reporter);
        self.process_deletes(&deletes, keepers.len(), &mut report, reporter);

        let run_timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        report.trace_folders = self.receipts.flush(&run_timestamp);

        reporter.on_stage_complete(
            Stage::Execute,
            report.moved + report.planned,
            start.elapsed().as_secs_f64(),
        );
        info!(
            "Execution phase complete: {} moved, {} already in place, {} missing, {} failed",
            report.moved, report.already_in_place, report.missing_sources, report.failed
        );
        Ok(report)
    }

    fn process_keepers(
        &mut self,
        keepers: &[FileRecord],
        report: &mut ExecutionReport,
        reporter: &dyn ProgressReporter,
    ) {
        info!("Processing {} keepers...", keepers.len());
        for (done, record) in keepers.iter().enumerate() {
            reporter.on_stage_progress(Stage::Execute, done + 1);
            let target = match record.target_path.as_deref() {
                Some(t) => t,
                None => continue,
            };

            let outcome = self.safe_move(&record.path, target, "Move");
            report.count(outcome);
            if outcome == MoveOutcome::Moved {
                self.reconcile_timestamps(record, Path::new(target));
                self.receipts
                    .record(&record.path, TraceBuffer::moved(record.file_name(), target));
            }
        }
    }

    fn process_deletes(
        &mut self,
        deletes: &[(FileRecord, Option<String>)],
        offset: usize,
        report: &mut ExecutionReport,
        reporter: &dyn ProgressReporter,
    ) {
        info!("Processing {} files to trash...", deletes.len());
        for (done, (record, winner)) in deletes.iter().enumerate() {
            reporter.on_stage_progress(Stage::Execute, offset + done + 1);
            let trash_path = Self::trash_path_for(&self.trash_root, record);

            let outcome = self.safe_move(&record.path, &trash_path, "Trash");
            report.count(outcome);
            if outcome != MoveOutcome::Moved {
                continue;
            }
            let message = match winner {
                Some(dst) => {
                    report.consolidated += 1;
                    TraceBuffer::consolidated(record.file_name(), dst)
                }
                None => {
                    warn!(
                        "'{}' had no keeper sharing its content; moved to trash",
                        record.path
                    );
                    report.trashed_without_keeper += 1;
                    TraceBuffer::trashed(record.file_name())
                }
            };
            self.receipts.record(&record.path, message);
        }
    }

    fn safe_move(&self, src: &str, dst: &str, action: &str) -> MoveOutcome {
        let (src_path, dst_path) = (Path::new(src), Path::new(dst));

        if same_location(src_path, dst_path) {
            debug!("Skipping move (already in place): {}", src);
            return MoveOutcome::AlreadyInPlace;
        }
        if self.dry_run {
            info!("[DRY] {}: '{}' -> '{}'", action, src, dst);
            return MoveOutcome::Planned;
        }
        if !src_path.exists() {
            warn!("Source file missing: {}", src);
            return MoveOutcome::SourceMissing;
        }
        match move_file(src_path, dst_path) {
            Ok(()) => {
                debug!("{}: '{}' -> '{}'", action, src, dst);
                MoveOutcome::Moved
            }
            Err(e) => {
                error!("Move failed: {} -> {} | Error: {}", src, dst, e);
                MoveOutcome::Failed
            }
        }
    }

    /// Creation time becomes the best known true date (jittered away from an
    /// artificial midnight); modification time is restored to its original
    /// value. The two are applied independently and neither is fatal.
    fn reconcile_timestamps(&self, record: &FileRecord, dst: &Path) {
        let best = resolve_effective_timestamp(record.created_at, record.modified_at);
        let creation = apply_jitter_if_midnight(best, &mut rand::thread_rng());

        match self
            .creation_time
            .set_created(dst, platform::system_time_from_secs(creation))
        {
            Ok(true) => {}
            Ok(false) => debug!("Creation time not settable on this platform: {}", dst.display()),
            Err(e) => warn!("Creation time fix failed for {}: {}", dst.display(), e),
        }

        if let Err(e) =
            platform::set_modified_time(dst, platform::system_time_from_secs(record.modified_at))
        {
            warn!("Modified time restore failed for {}: {}", dst.display(), e);
        }
    }
}
