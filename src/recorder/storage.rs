use crate::export::script::{Script, SCRIPT_VERSION};
use std::{fmt, io, path::Path};

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    Json(serde_json::Error),
    UnsupportedVersion(u32),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(error) => write!(f, "io error: {error}"),
            StorageError::Json(error) => write!(f, "invalid script json: {error}"),
            StorageError::UnsupportedVersion(v) => write!(f, "unsupported script version {v}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error)
    }
}

pub fn write_script(path: &Path, script: &Script) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(script)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_script(path: &Path) -> Result<Script, StorageError> {
    let contents = std::fs::read_to_string(path)?;
    let script: Script = serde_json::from_str(&contents)?;
    if script.version > SCRIPT_VERSION {
        return Err(StorageError::UnsupportedVersion(script.version));
    }
    Ok(script)
}
