pub mod script;
pub mod text;

pub use script::{build_script, EmitOptions, Instruction, Position, Script};

use crate::recorder::session::RecordingSession;
use crate::recorder::storage::{self, StorageError};
use std::fmt;
use std::path::{Path, PathBuf};

pub const SCRIPT_FILE: &str = "script.json";
pub const LISTING_FILE: &str = "script.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Text,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "json" => Ok(Self::Json),
            "txt" | "text" => Ok(Self::Text),
            other => Err(format!("Unknown export format: {other}")),
        }
    }
}

#[derive(Debug)]
pub enum ExportError {
    NoOutputDir,
    Storage(StorageError),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::NoOutputDir => write!(f, "recording has no output directory"),
            ExportError::Storage(err) => write!(f, "{err}"),
            ExportError::Io(err) => write!(f, "could not write script: {err}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<StorageError> for ExportError {
    fn from(err: StorageError) -> Self {
        ExportError::Storage(err)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err)
    }
}

/// Write `script` to `output_path` in the requested format.
pub fn export(
    script: &Script,
    format: ExportFormat,
    output_path: &Path,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Json => storage::write_script(output_path, script)?,
        ExportFormat::Text => {
            let title = output_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("script");
            std::fs::write(output_path, text::generate_content(title, script))?
        }
    }
    Ok(())
}

/// Emit a stopped recording into its own directory: the replayable
/// `script.json` plus a `script.txt` listing. Returns the JSON path.
pub fn write_recording(
    session: &RecordingSession,
    options: &EmitOptions,
) -> Result<PathBuf, ExportError> {
    let dir = session.output_dir().ok_or(ExportError::NoOutputDir)?;
    let script = build_script(session, options);

    let json_path = dir.join(SCRIPT_FILE);
    export(&script, ExportFormat::Json, &json_path)?;
    export(&script, ExportFormat::Text, &dir.join(LISTING_FILE))?;
    Ok(json_path)
}
