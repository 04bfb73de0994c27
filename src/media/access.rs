//! Path accessibility checks for request inputs and outputs.

use crate::error::{NightcoreError, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Input must exist, be a regular file and be readable.
pub fn check_input(path: &Path) -> Result<()> {
    let invalid = || NightcoreError::InvalidInputFilePath {
        path: path.to_path_buf(),
    };

    if path.as_os_str().is_empty() {
        return Err(invalid());
    }
    let metadata = fs::metadata(path).map_err(|_| invalid())?;
    if !metadata.is_file() {
        return Err(invalid());
    }
    fs::File::open(path).map_err(|_| invalid())?;
    Ok(())
}

/// Output must be creatable: its directory exists and an existing file there
/// is writable. Never creates or truncates the file.
pub fn check_output(path: &Path) -> Result<()> {
    let invalid = || NightcoreError::InvalidOutputFilePath {
        path: path.to_path_buf(),
    };

    if path.as_os_str().is_empty() || path.file_name().is_none() {
        return Err(invalid());
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let parent_meta = fs::metadata(parent).map_err(|_| invalid())?;
    if !parent_meta.is_dir() || parent_meta.permissions().readonly() {
        return Err(invalid());
    }

    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(invalid()),
        Ok(_) => {
            OpenOptions::new()
                .append(true)
                .open(path)
                .map_err(|_| invalid())?;
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_existing_input_passes() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("song.mp3");
        fs::write(&input, b"ID3").unwrap();
        assert!(check_input(&input).is_ok());
    }

    #[test]
    fn test_missing_input_fails() {
        let dir = TempDir::new().unwrap();
        let err = check_input(&dir.path().join("missing.mp3")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInputFilePath);
    }

    #[test]
    fn test_directory_input_fails() {
        let dir = TempDir::new().unwrap();
        assert!(check_input(dir.path()).is_err());
        assert!(check_input(Path::new("")).is_err());
    }

    #[test]
    fn test_new_output_in_existing_dir_passes_without_creating() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.flac");
        assert!(check_output(&output).is_ok());
        assert!(!output.exists(), "check must not create the output");
    }

    #[test]
    fn test_existing_output_is_not_truncated() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.wav");
        fs::write(&output, b"previous").unwrap();
        assert!(check_output(&output).is_ok());
        assert_eq!(fs::read(&output).unwrap(), b"previous");
    }

    #[test]
    fn test_output_in_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let err = check_output(&dir.path().join("nope").join("out.wav")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOutputFilePath);
    }

    #[test]
    fn test_output_that_is_a_directory_fails() {
        let dir = TempDir::new().unwrap();
        assert!(check_output(dir.path()).is_err());
    }
}
