use crate::error::Error;
use crate::storage::models::DispositionCounts;
use crate::storage::Database;
use tracing::{error, info};

/// Result of the pre-flight consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditReport {
    pub counts: DispositionCounts,
}

impl AuditReport {
    pub fn passed(&self) -> bool {
        let c = &self.counts;
        c.total == c.keeps + c.deletes && c.unset == 0 && c.keeps_without_target == 0
    }

    pub fn into_result(self) -> Result<Self, Error> {
        if self.passed() {
            Ok(self)
        } else {
            let c = self.counts;
            Err(Error::AuditFailed {
                total: c.total,
                keeps: c.keeps,
                deletes: c.deletes,
                unset: c.unset,
                missing_targets: c.keeps_without_target,
            })
        }
    }
}

/// Count dispositions and log the outcome. Never mutates the store.
pub fn perform_audit(db: &Database) -> Result<AuditReport, Error> {
    info!("--- PRE-FLIGHT SANITY CHECK ---");
    let counts = db.disposition_counts()?;
    info!("Total files: {}", counts.total);
    info!("To keep:     {}", counts.keeps);
    info!("To trash:    {}", counts.deletes);

    let report = AuditReport { counts };
    if counts.unset > 0 {
        error!("AUDIT FAIL: {} files have no disposition", counts.unset);
    }
    if counts.keeps_without_target > 0 {
        error!(
            "AUDIT FAIL: {} keepers have no target path",
            counts.keeps_without_target
        );
    }
    if counts.total != counts.keeps + counts.deletes {
        error!(
            "AUDIT FAIL: {} records but {} keep + {} delete",
            counts.total, counts.keeps, counts.deletes
        );
    }
    if report.passed() {
        info!("Audit passed");
    }
    Ok(report)
}
