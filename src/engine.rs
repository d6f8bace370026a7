use crate::analysis::audit::{self, AuditReport};
use crate::analysis::judge::{self, JudgeStats};
use crate::analysis::metadata::{self, CaptureDateProbe, NoCaptureDate};
use crate::analysis::planner::Planner;
use crate::config::{self, AppConfig};
use crate::error::Error;
use crate::execution::executor::{ExecutionReport, Executor};
use crate::execution::undo::{self, UndoReport};
use crate::hasher::cache::HashCache;
use crate::hasher::{Fingerprinter, FunnelStats};
use crate::progress::ProgressReporter;
use crate::scanner;
use crate::storage::Database;
use std::fs;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Drives the pipeline phases over one index store.
///
/// Phases can be run one at a time (each picks up whatever the store holds)
/// or chained with [`Pipeline::run_all`], which refuses to touch the
/// filesystem unless the consistency audit passes.
pub struct Pipeline {
    config: AppConfig,
    db: Database,
    probe: Box<dyn CaptureDateProbe>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub indexed: usize,
    pub funnel: FunnelStats,
    pub judge: JudgeStats,
    pub metadata_scored: usize,
    pub planned: usize,
    pub audit: AuditReport,
    pub execution: ExecutionReport,
    pub duration: Duration,
}

impl Pipeline {
    /// Open the index store named by `config.db_path`. See
    /// [`Pipeline::with_database`] for the default capture-date probe.
    pub fn open(config: AppConfig) -> Result<Self, Error> {
        let db = Database::open(&config.db_path)?;
        Ok(Self::with_database(config, db))
    }

    /// Capture dates come from [`NoCaptureDate`] until a real probe is set
    /// with [`Pipeline::with_probe`]. No EXIF decoder ships with this crate,
    /// so by default every `metadata_score` is 0 and the judge falls through
    /// to its date and name rules.
    pub fn with_database(config: AppConfig, db: Database) -> Self {
        Self {
            config,
            db,
            probe: Box::new(NoCaptureDate),
        }
    }

    pub fn with_probe(mut self, probe: impl CaptureDateProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The target root plus `roots` (or the configured source dirs when
    /// `roots` is empty), with nested roots collapsed.
    pub fn scan_roots(&self, roots: &[String]) -> Vec<String> {
        let sources = if roots.is_empty() {
            self.config.source_dirs.clone()
        } else {
            roots.iter().map(|r| config::normalize_path(r)).collect()
        };
        let mut all = vec![self.config.target_root.clone()];
        for root in sources {
            if !all.contains(&root) {
                all.push(root);
            }
        }
        config::non_overlapping_directories(all)
    }

    /// Wipe the index and rebuild it from the filesystem.
    pub fn inventory(
        &self,
        roots: &[String],
        reporter: &dyn ProgressReporter,
    ) -> Result<usize, Error> {
        fs::create_dir_all(&self.config.target_root)?;
        info!("Wiping index for a fresh run...");
        self.db.wipe()?;
        let last_trashed = Executor::highest_trash_id(&self.config.trash_folder)?;
        if last_trashed > 0 {
            self.db.reserve_ids_through(last_trashed)?;
        }

        let roots = self.scan_roots(roots);
        info!("Processing directories: {:?}", roots);
        scanner::scan_roots(&self.config, &roots, &self.db, reporter)
    }

    pub fn fingerprint(&self, reporter: &dyn ProgressReporter) -> Result<FunnelStats, Error> {
        let cache = match HashCache::open(self.config.hash_cache_path()) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("Hash cache unavailable, hashing without it: {}", e);
                None
            }
        };
        Fingerprinter::new(&self.db, cache, self.config.chunk_size)
            .with_batch_size(self.config.batch_size)
            .run(reporter)
    }

    /// Score capture-date metadata, then pick one survivor per duplicate set.
    pub fn analyze(&self, reporter: &dyn ProgressReporter) -> Result<(usize, JudgeStats), Error> {
        let scored = metadata::score_metadata(&self.db, self.probe.as_ref(), reporter)?;
        let stats = judge::judge_duplicates(&self.db, reporter)?;
        Ok((scored, stats))
    }

    pub fn plan(&self, reporter: &dyn ProgressReporter) -> Result<usize, Error> {
        let planner = Planner::new(&self.config.target_root, self.config.naming_template()?)?;
        planner.plan(&self.db, reporter)
    }

    pub fn audit(&self) -> Result<AuditReport, Error> {
        audit::perform_audit(&self.db)
    }

    pub fn execute(
        &self,
        dry_run: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExecutionReport, Error> {
        Executor::new(&self.db, &self.config.trash_folder, dry_run).execute(reporter)
    }

    pub fn undo(&self, dry_run: bool, reporter: &dyn ProgressReporter) -> Result<UndoReport, Error> {
        undo::undo(&self.db, &self.config.trash_folder, dry_run, reporter)
    }

    /// Audit the store and execute only if it passes. On failure nothing is
    /// touched and `Error::AuditFailed` is returned.
    pub fn execute_audited(
        &self,
        dry_run: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<(AuditReport, ExecutionReport), Error> {
        let audit = self.audit()?.into_result()?;
        let execution = self.execute(dry_run, reporter)?;
        Ok((audit, execution))
    }

    /// Every phase in order. Execution only starts once the audit passes;
    /// otherwise `Error::AuditFailed` is returned and nothing has moved.
    pub fn run_all(
        &self,
        roots: &[String],
        dry_run: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary, Error> {
        let start = Instant::now();
        let indexed = self.inventory(roots, reporter)?;
        let funnel = self.fingerprint(reporter)?;
        let (metadata_scored, judge) = self.analyze(reporter)?;
        let planned = self.plan(reporter)?;
        let (audit, execution) = self.execute_audited(dry_run, reporter)?;

        Ok(RunSummary {
            indexed,
            funnel,
            judge,
            metadata_scored,
            planned,
            audit,
            execution,
            duration: start.elapsed(),
        })
    }
}
