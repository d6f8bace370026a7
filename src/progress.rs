/// Pipeline phases reported to a [`ProgressReporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Inventory,
    PartialHash,
    FullHash,
    Metadata,
    Judge,
    Plan,
    Execute,
    Undo,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Inventory => "Scanning files",
            Stage::PartialHash => "Partial hashing",
            Stage::FullHash => "Full hashing",
            Stage::Metadata => "Reading metadata",
            Stage::Judge => "Judging duplicates",
            Stage::Plan => "Planning destinations",
            Stage::Execute => "Moving files",
            Stage::Undo => "Restoring files",
        }
    }
}

/// Trait for reporting pipeline progress.
///
/// The CLI implements it with indicatif bars. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_stage_start(&self, _stage: Stage, _total: Option<usize>) {}
    fn on_stage_progress(&self, _stage: Stage, _done: usize) {}
    fn on_stage_complete(&self, _stage: Stage, _count: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
