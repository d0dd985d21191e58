//! Safe file reading for batch analysis
//!
//! Inputs are opaque text blobs, so the only checks made before handing them
//! to the detector are about the file itself: symlinks and non-regular files
//! are rejected and the size is bounded. Content is never interpreted here.

use crate::diagnostics::{FormatError, FormatResult};
use std::fs;
use std::path::Path;

/// Default maximum file size (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read a file with the default size limit.
///
/// # Errors
///
/// Returns `FormatError::FileSymlink` if the path is a symlink,
/// `FormatError::FileNotRegular` for directories, FIFOs and devices,
/// `FormatError::FileTooBig` above the limit, and `FormatError::FileRead`
/// for I/O failures (including content that is not UTF-8).
pub fn safe_read_file(path: &Path) -> FormatResult<String> {
    safe_read_file_with_limit(path, DEFAULT_MAX_FILE_SIZE)
}

/// Read a file with a custom size limit. Files of exactly `max_size` bytes
/// are accepted.
pub fn safe_read_file_with_limit(path: &Path, max_size: u64) -> FormatResult<String> {
    // symlink_metadata does not follow the link
    let metadata = fs::symlink_metadata(path).map_err(|e| FormatError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    if metadata.file_type().is_symlink() {
        return Err(FormatError::FileSymlink {
            path: path.to_path_buf(),
        });
    }

    if !metadata.is_file() {
        return Err(FormatError::FileNotRegular {
            path: path.to_path_buf(),
        });
    }

    let size = metadata.len();
    if size > max_size {
        return Err(FormatError::FileTooBig {
            path: path.to_path_buf(),
            size,
            limit: max_size,
        });
    }

    fs::read_to_string(path).map_err(|e| FormatError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Lowercased extension of a file name: the text after the last `.`.
///
/// Returns `None` when there is no dot or the name ends with one.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() || ext.contains('/') || ext.contains('\\') {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_csv_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("people.csv");
        fs::write(&file_path, "name,age\nada,36\n").unwrap();

        assert_eq!(safe_read_file(&file_path).unwrap(), "name,age\nada,36\n");
    }

    #[test]
    fn test_missing_file() {
        let result = safe_read_file(Path::new("/nonexistent/input.json"));
        assert!(matches!(result, Err(FormatError::FileRead { .. })));
    }

    #[test]
    fn test_non_utf8_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("binary.dat");
        fs::write(&file_path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let result = safe_read_file(&file_path);
        assert!(matches!(result, Err(FormatError::FileRead { .. })));
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let temp = TempDir::new().unwrap();
        let exact = temp.path().join("exact.xml");
        let over = temp.path().join("over.xml");
        fs::write(&exact, vec![b'x'; 256]).unwrap();
        fs::write(&over, vec![b'x'; 257]).unwrap();

        assert!(safe_read_file_with_limit(&exact, 256).is_ok());
        match safe_read_file_with_limit(&over, 256) {
            Err(FormatError::FileTooBig { size, limit, .. }) => {
                assert_eq!(size, 257);
                assert_eq!(limit, 256);
            }
            other => panic!("Expected FileTooBig error, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_rejected() {
        let temp = TempDir::new().unwrap();
        let result = safe_read_file(temp.path());
        assert!(matches!(result, Err(FormatError::FileNotRegular { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_rejected() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let target = temp.path().join("data.json");
        let link = temp.path().join("link.json");
        fs::write(&target, "{}").unwrap();
        symlink(&target, &link).unwrap();

        match safe_read_file(&link) {
            Err(FormatError::FileSymlink { path }) => assert_eq!(path, link),
            other => panic!("Expected FileSymlink error, got {:?}", other),
        }
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("data.CSV"), Some("csv".to_string()));
        assert_eq!(extension_of("archive.tar.xml"), Some("xml".to_string()));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of("trailing."), None);
        assert_eq!(extension_of("dir.d/file"), None);
    }
}
