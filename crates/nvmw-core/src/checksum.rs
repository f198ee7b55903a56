use std::io::Read;
use std::path::Path;

use nvmw_backend::NvmError;
use sha2::{Digest, Sha256};

/// Look up `artifact` in a `SHASUMS256.txt` listing.
#[must_use]
pub fn parse_expected_checksum(checksums: &str, artifact: &str) -> Option<String> {
    checksums.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let hash = parts.next()?;
        let name = parts
            .next()?
            .trim_start_matches('*')
            .trim_start_matches("./");
        (name == artifact).then(|| hash.to_ascii_lowercase())
    })
}

/// Hex SHA-256 digest of a file.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String, NvmError> {
    let mut file = std::fs::File::open(path)
        .map_err(|error| NvmError::io_with_path("open file for checksum", path, &error))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|error| NvmError::io_with_path("read file for checksum", path, &error))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
