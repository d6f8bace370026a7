pub mod executor;
pub mod trace;
pub mod undo;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Move `src` to `dst` without ever overwriting an existing file.
///
/// A rename is tried first; across filesystems the file is copied and the
/// source removed. If the source cannot be removed the copy is deleted, so
/// the file ends up in exactly one place.
pub fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination already exists: {}", dst.display()),
        ));
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !src.is_file() {
                return Err(rename_err);
            }
            fs::copy(src, dst)?;
            if let Err(e) = fs::remove_file(src) {
                let _ = fs::remove_file(dst);
                return Err(e);
            }
            Ok(())
        }
    }
}

/// Absolute form of `path` for same-location checks. Falls back to the
/// path itself when the working directory is unavailable.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn same_location(a: &Path, b: &Path) -> bool {
    absolute(a) == absolute(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("x").join("y").join("a.txt");
        fs::write(&src, "hello").unwrap();

        move_file(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "hello");
    }

    #[test]
    fn test_move_file_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old").unwrap();

        let err = move_file(&src, &dst).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
        assert!(src.exists());
    }

    #[test]
    fn test_same_location() {
        assert!(same_location(Path::new("/a/b/c.jpg"), Path::new("/a/b/c.jpg")));
        assert!(!same_location(Path::new("/a/b/c.jpg"), Path::new("/a/b/d.jpg")));
    }
}
