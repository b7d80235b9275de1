//! # Snapshot I/O
//!
//! Every stage reads its input from, and writes its output to, a pretty
//! printed UTF-8 JSON file, so any stage can be rerun on its own.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::PipelineError;

/// Read a JSON array snapshot
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PipelineError::InputMissing {
            path: path.to_path_buf(),
        },
        _ => PipelineError::InputMalformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    })?;
    let records: Vec<T> = serde_json::from_str(&contents).map_err(|e| PipelineError::InputMalformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Write any serializable value as pretty JSON, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PipelineError::OutputUnwritable {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| PipelineError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| PipelineError::OutputUnwritable {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a JSON array snapshot
pub fn write_snapshot<T: Serialize>(path: &Path, records: &[T]) -> Result<(), PipelineError> {
    write_json(path, records)?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_input_missing() {
        let dir = TempDir::new().unwrap();
        let result = read_snapshot::<serde_json::Value>(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(PipelineError::InputMissing { .. })));
    }

    #[test]
    fn test_non_array_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        let result = read_snapshot::<serde_json::Value>(&path);
        assert!(matches!(result, Err(PipelineError::InputMalformed { .. })));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.json");
        write_snapshot(&path, &[1, 2, 3]).unwrap();
        let back: Vec<i32> = read_snapshot(&path).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
