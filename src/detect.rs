//! PDF header sniffing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

const MAGIC: &[u8] = b"%PDF-";

/// Version from a PDF header such as `%PDF-1.7`.
///
/// Returns [`Error::UnknownFormat`] when the magic bytes are missing and
/// [`Error::UnsupportedVersion`] when the version is not `d.d`.
pub fn sniff_version(data: &[u8]) -> Result<String> {
    let rest = data.strip_prefix(MAGIC).ok_or(Error::UnknownFormat)?;
    let version = rest.get(..3).ok_or(Error::UnknownFormat)?;

    match version {
        [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            Ok(String::from_utf8_lossy(version).into_owned())
        }
        _ => Err(Error::UnsupportedVersion(
            String::from_utf8_lossy(version).into_owned(),
        )),
    }
}

/// Read the first bytes of a file and sniff its version.
pub fn sniff_version_from_path<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut header = Vec::with_capacity(16);
    File::open(path)?.take(16).read_to_end(&mut header)?;
    sniff_version(&header)
}

/// Check if bytes start with a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    sniff_version(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_versions() {
        assert_eq!(sniff_version(b"%PDF-1.7\n%\xe2\xe3").unwrap(), "1.7");
        assert_eq!(sniff_version(b"%PDF-2.0\n").unwrap(), "2.0");
    }

    #[test]
    fn test_sniff_rejects_other_formats() {
        assert!(matches!(sniff_version(b"<!DOCTYPE html>"), Err(Error::UnknownFormat)));
        assert!(matches!(sniff_version(b"%PDF"), Err(Error::UnknownFormat)));
        assert!(matches!(
            sniff_version(b"%PDF-x.y"),
            Err(Error::UnsupportedVersion(v)) if v == "x.y"
        ));
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.4\n"));
        assert!(!is_pdf_bytes(b"Not a PDF"));
    }

    #[test]
    fn test_sniff_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"%PDF-1.5\n").unwrap();
        assert_eq!(sniff_version_from_path(file.path()).unwrap(), "1.5");
    }
}
