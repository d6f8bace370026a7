//! Filesystem timestamp capabilities that differ per platform.

#[cfg(target_os = "windows")]
pub mod windows;

use std::fs::{File, FileTimes, OpenOptions};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// "Set creation time if the platform supports it."
///
/// `Ok(false)` means the platform has no settable creation time; callers
/// treat that, and any error, as non-fatal.
pub trait CreationTimeSetter {
    fn set_created(&self, path: &Path, created: SystemTime) -> io::Result<bool>;
}

/// Uses the host platform's native creation-time call where one exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCreationTime;

impl CreationTimeSetter for NativeCreationTime {
    #[cfg(target_os = "windows")]
    fn set_created(&self, path: &Path, created: SystemTime) -> io::Result<bool> {
        windows::set_creation_time(path, created)?;
        Ok(true)
    }

    #[cfg(target_os = "macos")]
    fn set_created(&self, path: &Path, created: SystemTime) -> io::Result<bool> {
        use std::os::macos::fs::FileTimesExt;
        let file = open_for_times(path)?;
        file.set_times(FileTimes::new().set_created(created))?;
        Ok(true)
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    fn set_created(&self, _path: &Path, _created: SystemTime) -> io::Result<bool> {
        Ok(false)
    }
}

/// Capability stand-in for platforms or tests that never set creation time.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCreationTime;

impl CreationTimeSetter for NoCreationTime {
    fn set_created(&self, _path: &Path, _created: SystemTime) -> io::Result<bool> {
        Ok(false)
    }
}

pub(crate) fn open_for_times(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).open(path)
}

/// Set the modification time, with access time set to now.
pub fn set_modified_time(path: &Path, modified: SystemTime) -> io::Result<()> {
    let file = open_for_times(path)?;
    file.set_times(
        FileTimes::new()
            .set_accessed(SystemTime::now())
            .set_modified(modified),
    )
}

/// Epoch seconds to `SystemTime`; negative values clamp to the epoch.
pub fn system_time_from_secs(ts: f64) -> SystemTime {
    if ts.is_finite() && ts > 0.0 {
        UNIX_EPOCH + Duration::from_secs_f64(ts)
    } else {
        UNIX_EPOCH
    }
}

pub fn secs_from_system_time(t: SystemTime) -> f64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}
