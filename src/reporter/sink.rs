use crate::configuration::constants::layout::{ERROR_FILE_NAME, RESULT_FILE_NAME};
use crate::reporter::record::ResultRecord;
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot encode descriptor for '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Appends `record` to the descriptor in `dir`. Failures are logged and
/// swallowed: losing a report fragment must not fail the run.
pub fn append(dir: &Path, record: &ResultRecord) {
    if let Err(e) = try_append(dir, record) {
        error!("Error writing result descriptor: {}", e);
    }
}

/// Read-modify-write of the descriptor in `dir`. `update` receives the
/// existing record, or an empty one when there is none.
pub fn update<F>(dir: &Path, update: F)
where
    F: FnOnce(&mut ResultRecord),
{
    let mut record = load(dir).unwrap_or_default();
    update(&mut record);
    if let Err(e) = try_write(dir, &record) {
        error!("Error writing result descriptor: {}", e);
    }
}

/// Writes the failure message of a leaf beside its descriptor.
pub fn write_error(dir: &Path, message: &str) {
    let path = dir.join(ERROR_FILE_NAME);
    if let Err(e) = fs::write(&path, message) {
        error!("Error writing {}: {}", path.display(), e);
    }
}

/// Loads the first document of the descriptor in `dir`, if any.
pub fn load(dir: &Path) -> Option<ResultRecord> {
    let path = dir.join(RESULT_FILE_NAME);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            error!("Cannot read {}: {}", path.display(), e);
            return None;
        }
    };
    let first = serde_yaml::Deserializer::from_str(&text).next()?;
    match ResultRecord::deserialize(first) {
        Ok(record) => Some(record),
        Err(e) => {
            error!("Ignoring unreadable descriptor {}: {}", path.display(), e);
            None
        }
    }
}

fn encode(path: &Path, record: &ResultRecord) -> Result<String, SinkError> {
    serde_yaml::to_string(record)
        .map(|body| format!("---\n{}", body))
        .map_err(|source| SinkError::Yaml {
            path: path.display().to_string(),
            source,
        })
}

fn try_append(dir: &Path, record: &ResultRecord) -> Result<(), SinkError> {
    let path = dir.join(RESULT_FILE_NAME);
    let document = encode(&path, record)?;
    let io_error = |source| SinkError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .map_err(io_error)?;
    file.write_all(document.as_bytes()).map_err(io_error)?;
    file.flush().map_err(io_error)
}

fn try_write(dir: &Path, record: &ResultRecord) -> Result<(), SinkError> {
    let path = dir.join(RESULT_FILE_NAME);
    let document = encode(&path, record)?;
    fs::write(&path, document).map_err(|source| SinkError::Io {
        path: path.display().to_string(),
        source,
    })
}
