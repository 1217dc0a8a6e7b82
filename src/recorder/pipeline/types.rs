//! Pipeline types, state, and error definitions.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::super::capture::CaptureError;
use super::super::session::SessionError;
use crate::export::ExportError;

/// Wall-clock source for recording directory and screenshot names.
pub trait Clock: Send {
    fn wall_time(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Transient engine state that must not leak between recordings.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// Arrival of the last accepted motion sample. `None` means the next
    /// sample passes the gate unconditionally.
    pub last_motion: Option<Instant>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn reopen_motion_gate(&mut self) {
        self.last_motion = None;
    }

    pub fn motion_gate_open(&self, at: Instant, interval: Duration) -> bool {
        match self.last_motion {
            None => true,
            Some(last) => at.saturating_duration_since(last) >= interval,
        }
    }
}

/// What the engine did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderOutcome {
    /// Not recording, or a hot key press.
    Ignored,
    Recorded,
    /// Same occurrence as the last step.
    Coalesced,
    /// Motion inside the sampling interval.
    Throttled,
    Started { dir: PathBuf },
    Stopped { script: PathBuf },
    ScreenshotSaved { file: PathBuf },
}

#[derive(Debug)]
pub enum PipelineError {
    Session(SessionError),
    /// Screenshot capture or write failed; the recording continues.
    ScreenshotFailed(CaptureError),
    /// Recording stopped but the script could not be written.
    EmitFailed(ExportError),
    NoOutputDir,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Session(err) => write!(f, "session error: {err}"),
            PipelineError::ScreenshotFailed(err) => write!(f, "screenshot failed: {err}"),
            PipelineError::EmitFailed(err) => write!(f, "script emission failed: {err}"),
            PipelineError::NoOutputDir => write!(f, "recording has no output directory"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<SessionError> for PipelineError {
    fn from(err: SessionError) -> Self {
        PipelineError::Session(err)
    }
}

impl From<CaptureError> for PipelineError {
    fn from(err: CaptureError) -> Self {
        PipelineError::ScreenshotFailed(err)
    }
}

impl From<ExportError> for PipelineError {
    fn from(err: ExportError) -> Self {
        PipelineError::EmitFailed(err)
    }
}
