//! MD5 digest of the active database file.
//!
//! The update endpoint uses the digest to decide whether the caller is
//! already current.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

/// Returns the lowercase hex MD5 of the file at `path`.
///
/// A missing file yields `Ok(None)`; other I/O errors are returned.
pub fn file_md5(path: &Path) -> io::Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut hasher = Md5::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(Some(to_hex(&hasher.finalize())))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_has_no_checksum() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = file_md5(&temp_dir.path().join("GeoIP.dat"));
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn test_known_digests() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("GeoIP.dat");

        std::fs::write(&path, b"").unwrap();
        assert_eq!(
            file_md5(&path).unwrap().as_deref(),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );

        std::fs::write(&path, b"The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(
            file_md5(&path).unwrap().as_deref(),
            Some("9e107d9d372bb6826bd81d3542a419d6")
        );
    }

    #[test]
    fn test_large_file_spans_buffers() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("GeoIP.dat");
        let data = vec![0xABu8; 200 * 1024 + 7];
        std::fs::write(&path, &data).unwrap();

        let mut hasher = Md5::new();
        hasher.update(&data);
        assert_eq!(file_md5(&path).unwrap(), Some(to_hex(&hasher.finalize())));
    }
}
