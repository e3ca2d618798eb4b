pub mod clipboard;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const EXPORT_FILE_NAME: &str = "text.txt";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("clipboard is unavailable: {0}")]
    Clipboard(String),
}

/// Writes `text` verbatim to `text.txt` inside `dir`, returning the file path.
pub fn export_text(dir: &Path, text: &str) -> Result<PathBuf, ExportError> {
    let path = dir.join(EXPORT_FILE_NAME);
    let write_error = |err: std::io::Error| ExportError::Write {
        path: path.clone(),
        message: err.to_string(),
    };

    fs::create_dir_all(dir).map_err(write_error)?;
    fs::write(&path, text.as_bytes()).map_err(write_error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_writes_text_verbatim() {
        let dir = tempfile::tempdir().expect("temp dir");
        let text = "line one\n<tag> & 'quotes'\n";

        let path = export_text(dir.path(), text).expect("export should succeed");

        assert_eq!(path.file_name().and_then(|name| name.to_str()), Some("text.txt"));
        assert_eq!(fs::read_to_string(path).expect("read back"), text);
    }

    #[test]
    fn export_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("downloads");

        export_text(&target, "").expect("export should succeed");

        assert!(target.join(EXPORT_FILE_NAME).exists());
    }
}
