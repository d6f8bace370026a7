use crate::error::Error;
use crate::progress::{ProgressReporter, Stage};
use crate::storage::Database;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Extensions the capture-date probe is asked about.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".heic", ".webp"];

/// Score for a file carrying an embedded original-capture date.
pub const CAPTURE_DATE_SCORE: i64 = 10;

/// Boundary to an embedded-metadata decoder: does this image carry its
/// original capture date?
pub trait CaptureDateProbe {
    fn has_capture_date(&self, path: &Path) -> bool;
}

/// Probe used when no decoder is wired in. Every file scores zero.
pub struct NoCaptureDate;

impl CaptureDateProbe for NoCaptureDate {
    fn has_capture_date(&self, _path: &Path) -> bool {
        false
    }
}

impl<F> CaptureDateProbe for F
where
    F: Fn(&Path) -> bool,
{
    fn has_capture_date(&self, path: &Path) -> bool {
        self(path)
    }
}

pub fn metadata_score(has_capture_date: bool) -> i64 {
    if has_capture_date {
        CAPTURE_DATE_SCORE
    } else {
        0
    }
}

/// Ask `probe` about every unanalyzed image record and store its score.
pub fn score_metadata(
    db: &Database,
    probe: &dyn CaptureDateProbe,
    reporter: &dyn ProgressReporter,
) -> Result<usize, Error> {
    let rows = db.unanalyzed_records(IMAGE_EXTENSIONS)?;
    if rows.is_empty() {
        return Ok(0);
    }
    info!("Analyzing metadata for {} files...", rows.len());
    let start = Instant::now();
    reporter.on_stage_start(Stage::Metadata, Some(rows.len()));

    let mut updates = Vec::with_capacity(rows.len());
    for (done, (id, path)) in rows.iter().enumerate() {
        let has_date = probe.has_capture_date(Path::new(path));
        updates.push((*id, has_date, metadata_score(has_date)));
        reporter.on_stage_progress(Stage::Metadata, done + 1);
    }
    let count = db.set_metadata_scores(&updates)?;

    reporter.on_stage_complete(Stage::Metadata, count, start.elapsed().as_secs_f64());
    Ok(count)
}

/// Ingest capture-date signals computed elsewhere, keyed by record path.
/// Unknown paths are skipped with a warning.
pub fn apply_capture_signals(db: &Database, signals: &[(String, bool)]) -> Result<usize, Error> {
    let mut updates = Vec::with_capacity(signals.len());
    for (path, has_date) in signals {
        match db.get_record_by_path(path)? {
            Some(record) => updates.push((record.id, *has_date, metadata_score(*has_date))),
            None => warn!("No indexed record for metadata signal '{}'", path),
        }
    }
    Ok(db.set_metadata_scores(&updates)?)
}
