use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::CheckError;

/// Compute the hex-encoded SHA-256 digest of a file.
///
/// The digest depends **only** on the file bytes; it is streamed in
/// fixed-size chunks so large firmware images are never loaded into
/// memory at once. Chunking does not affect the resulting digest.
pub fn sha256_hex(path: &Path) -> Result<String, CheckError> {
    let file = File::open(path).map_err(|e| CheckError::io("open", path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| CheckError::io("read", path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_artifact(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn computes_known_digest() {
        let file = temp_artifact(b"fwcheck-test");

        // echo -n "fwcheck-test" | sha256sum
        assert_eq!(
            sha256_hex(file.path()).unwrap(),
            "5207524b9993fb1b330dae794c2f7b75535b7d0559bc20d93cb172935841701a"
        );
    }

    #[test]
    fn digest_is_stable_across_chunk_boundaries() {
        // Larger than one 64 KiB read, so the streaming loop runs
        // more than once.
        let data = vec![0xA5u8; 200 * 1024];
        let file = temp_artifact(&data);

        let mut hasher = Sha256::new();
        hasher.update(&data);
        let expected = hex::encode(hasher.finalize());

        assert_eq!(sha256_hex(file.path()).unwrap(), expected);
    }

    #[test]
    fn single_byte_change_alters_digest() {
        let a = temp_artifact(b"firmware-v1.0");
        let b = temp_artifact(b"firmware-v1.1");

        assert_ne!(
            sha256_hex(a.path()).unwrap(),
            sha256_hex(b.path()).unwrap()
        );
    }

    #[test]
    fn missing_file_returns_error() {
        let result = sha256_hex(Path::new("/nonexistent/firmware.bin"));
        assert!(matches!(result, Err(CheckError::Io { .. })));
    }
}
