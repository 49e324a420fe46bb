//! Whole-file JSON persistence shared by the file-backed stores.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StoreError};

/// Load a JSON document. Returns `Ok(None)` if the file doesn't exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let document = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(document))
}

/// Write a JSON document by replacing the file through a sibling temp file,
/// so a reader never observes a half-written document.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized or written.
pub fn save_json_file<T: Serialize>(path: &Path, document: &T, pretty: bool) -> Result<()> {
    let content = if pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    }
    .map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let staging = staging_path(path);
    fs::write(&staging, content).map_err(|source| StoreError::Write {
        path: staging.clone(),
        source,
    })?;
    fs::rename(&staging, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn load_missing_file_returns_none() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        let loaded: Option<Vec<u32>> = load_json_file(&dir.path().join("absent.json"))?;

        assert!(loaded.is_none());
        Ok(())
    }

    #[test]
    fn save_then_load_returns_document() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("doc.json");
        let document = BTreeMap::from([("a".to_string(), 1_u32), ("b".to_string(), 2)]);

        save_json_file(&path, &document, true)?;
        let loaded: Option<BTreeMap<String, u32>> = load_json_file(&path)?;

        assert_eq!(loaded, Some(document));
        assert!(!staging_path(&path).exists());
        Ok(())
    }

    #[test]
    fn load_garbage_reports_parse_error_with_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json")?;

        let result: Result<Option<Vec<u32>>> = load_json_file(&path);

        match result {
            Err(StoreError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn staging_path_is_a_sibling() {
        let path = Path::new("/data/history.json");
        assert_eq!(staging_path(path), PathBuf::from("/data/history.json.tmp"));
    }
}
