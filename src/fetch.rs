use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Source fetching – local path or http(s) URL, always checksummed
// ---------------------------------------------------------------------------

/// Whether a source string names a remote URL rather than a local path.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Read a source fully into memory and compute its SHA-256 hex digest.
///
/// URLs are fetched with a single blocking GET; anything else is read from
/// the local filesystem. No retry, no resume.
pub fn fetch_source(source: &str) -> Result<(Vec<u8>, String)> {
    let bytes = if is_url(source) {
        let response = reqwest::blocking::get(source)
            .with_context(|| format!("requesting {source}"))?;
        if !response.status().is_success() {
            bail!("GET {source} returned {}", response.status());
        }
        response
            .bytes()
            .with_context(|| format!("reading response body from {source}"))?
            .to_vec()
    } else {
        fs::read(source).with_context(|| format!("reading {source}"))?
    };

    let checksum = sha256_hex(&bytes);
    Ok((bytes, checksum))
}

/// [`fetch_source`], decoded as UTF-8 text.
pub fn fetch_source_text(source: &str) -> Result<(String, String)> {
    let (bytes, checksum) = fetch_source(source)?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("{source} is not valid UTF-8"))?;
    Ok((text, checksum))
}

/// Stage a raw upstream file at `dest`, overwriting any existing file.
/// Returns the SHA-256 hex digest of the staged bytes.
pub fn download(url: &str, dest: &Path) -> Result<String> {
    log::info!("downloading {url} -> {}", dest.display());
    let (bytes, checksum) = fetch_source(url)?;

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(dest, &bytes)
        .with_context(|| format!("writing staged file {}", dest.display()))?;
    Ok(checksum)
}

/// SHA-256 hex digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_urls() {
        assert!(is_url("https://example.org/gfall.dat"));
        assert!(is_url("http://example.org/gfall.dat"));
        assert!(!is_url("/tmp/gfall.dat"));
        assert!(!is_url("gfall.dat"));
    }

    #[test]
    fn local_fetch_returns_bytes_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, b"abc").unwrap();

        let (bytes, checksum) = fetch_source(path.to_str().unwrap()).unwrap();
        assert_eq!(bytes, b"abc");
        // Well-known SHA-256 of "abc".
        assert_eq!(
            checksum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn missing_local_file_is_an_error() {
        assert!(fetch_source("/definitely/not/there.dat").is_err());
    }
}
