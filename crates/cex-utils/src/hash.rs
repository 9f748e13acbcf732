//! Content hashing for cache fingerprints.
//!
//! The engine fingerprints file contents with SHA-256 read in fixed-size
//! chunks, never the whole file at once, so hashing a large output doesn't
//! require holding it in memory.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 8192;

/// Hash the bytes at `path`, or `None` if the path does not exist.
pub fn hash_file(path: &Path) -> io::Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(Some(hex::encode(hasher.finalize())))
}

/// Hash an in-memory byte slice, for data that hasn't touched disk yet.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_hashes_to_none() {
        assert_eq!(hash_file(Path::new("/nonexistent/does/not/exist")).unwrap(), None);
    }

    #[test]
    fn same_contents_same_hash() {
        let mut f1 = NamedTempFile::new().unwrap();
        f1.write_all(b"hello world").unwrap();
        let h1 = hash_file(f1.path()).unwrap().unwrap();
        assert_eq!(h1, hash_bytes(b"hello world"));
    }

    #[test]
    fn different_contents_different_hash() {
        let mut f1 = NamedTempFile::new().unwrap();
        f1.write_all(b"one").unwrap();
        let mut f2 = NamedTempFile::new().unwrap();
        f2.write_all(b"two").unwrap();

        assert_ne!(
            hash_file(f1.path()).unwrap().unwrap(),
            hash_file(f2.path()).unwrap().unwrap()
        );
    }

    #[test]
    fn chunked_read_matches_whole_file() {
        let mut f = NamedTempFile::new().unwrap();
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        f.write_all(&data).unwrap();
        assert_eq!(hash_file(f.path()).unwrap().unwrap(), hash_bytes(&data));
    }
}
