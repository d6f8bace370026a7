use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

pub const TRACE_FILE_NAME: &str = "media_trace.txt";

/// Per-folder audit lines buffered during a run.
///
/// Lines are keyed by the folder a file used to live in and appended to a
/// trace file in that folder once the run is over, so anyone can see what
/// happened to a folder's files without the index store.
#[derive(Debug, Default)]
pub struct TraceBuffer {
    entries: BTreeMap<String, Vec<String>>,
}

impl TraceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record(&mut self, src_path: &str, message: String) {
        let parent = src_path.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
        self.entries.entry(parent.to_string()).or_default().push(message);
    }

    pub fn moved(file_name: &str, destination: &str) -> String {
        format!("[MOVED] '{}' -> '{}'", file_name, destination)
    }

    pub fn consolidated(file_name: &str, winner_destination: &str) -> String {
        format!("[DUPLICATE CONSOLIDATED] '{}' -> '{}'", file_name, winner_destination)
    }

    pub fn trashed(file_name: &str) -> String {
        format!("[MOVED TO TRASH] '{}'", file_name)
    }

    /// Append every folder's lines under one run header. Folders that cannot
    /// be written are logged and skipped. Returns the folders written.
    pub fn flush(&mut self, run_timestamp: &str) -> usize {
        if self.entries.is_empty() {
            info!("No files moved, so no trace receipts written");
            return 0;
        }
        let mut written = 0;
        for (folder, lines) in std::mem::take(&mut self.entries) {
            match append_trace(Path::new(&folder), run_timestamp, &lines) {
                Ok(()) => written += 1,
                Err(e) => warn!("Failed to write trace to {}: {}", folder, e),
            }
        }
        info!("Trace receipts written to {} source folders", written);
        written
    }
}

fn append_trace(folder: &Path, run_timestamp: &str, lines: &[String]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(folder.join(TRACE_FILE_NAME))?;
    writeln!(file)?;
    writeln!(file, "--- Media Consolidator Run: {} ---", run_timestamp)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}
