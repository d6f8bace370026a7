use std::io;
use std::os::windows::fs::FileTimesExt;
use std::path::Path;
use std::time::SystemTime;

use std::fs::FileTimes;

/// Write the NTFS creation timestamp, leaving the other times untouched.
pub fn set_creation_time(path: &Path, created: SystemTime) -> io::Result<()> {
    let file = super::open_for_times(path)?;
    file.set_times(FileTimes::new().set_created(created))
}
