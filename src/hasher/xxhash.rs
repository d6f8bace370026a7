use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use twox_hash::XxHash64;

const FULL_HASH_BUFFER: usize = 64 * 1024;

/// Hex digest of a finished hasher, fixed width so it sorts and compares as text.
fn to_hex(hasher: &XxHash64) -> String {
    format!("{:016x}", hasher.finish())
}

pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    to_hex(&hasher)
}

/// Hash the first `chunk_size` bytes, plus the last `chunk_size` bytes when
/// the file is larger than two chunks.
pub fn partial_hash(file: &Path, file_size: u64, chunk_size: usize) -> io::Result<String> {
    let mut f = File::open(file)?;
    let mut hasher = XxHash64::with_seed(0);

    let mut head = Vec::with_capacity(chunk_size);
    (&mut f).take(chunk_size as u64).read_to_end(&mut head)?;
    hasher.write(&head);

    if file_size > (chunk_size as u64) * 2 {
        f.seek(SeekFrom::End(-(chunk_size as i64)))?;
        let mut tail = Vec::with_capacity(chunk_size);
        f.take(chunk_size as u64).read_to_end(&mut tail)?;
        hasher.write(&tail);
    }

    Ok(to_hex(&hasher))
}

/// Hash the complete byte stream without holding the file in memory.
pub fn full_hash(file: &Path) -> io::Result<String> {
    let mut f = File::open(file)?;
    let mut hasher = XxHash64::with_seed(0);
    let mut buffer = vec![0u8; FULL_HASH_BUFFER];
    loop {
        let n = match f.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.write(&buffer[..n]);
    }
    Ok(to_hex(&hasher))
}
