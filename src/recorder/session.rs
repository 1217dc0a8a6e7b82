use super::state::{RecorderAction, RecorderState, RecorderStateError, SessionState};
use super::types::RecordedStep;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug)]
pub enum SessionError {
    State(RecorderStateError),
    Io(std::io::Error),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::State(err) => write!(f, "{err}"),
            SessionError::Io(err) => write!(f, "failed to create recording directory: {err}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<RecorderStateError> for SessionError {
    fn from(err: RecorderStateError) -> Self {
        SessionError::State(err)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err)
    }
}

/// The single active recording. Passed explicitly to the recorder and the
/// script emitter; nothing about it is global.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    state: RecorderState,
    start_time: Option<Instant>,
    steps: Vec<RecordedStep>,
    output_root: PathBuf,
    output_dir: Option<PathBuf>,
}

impl RecordingSession {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            state: RecorderState::new(),
            start_time: None,
            steps: Vec::new(),
            output_root: output_root.into(),
            output_dir: None,
        }
    }

    /// Idle → Recording. Clears previous steps and creates
    /// `recording_<epoch_ms>` under the output root.
    pub fn begin(&mut self, at: Instant, wall: DateTime<Utc>) -> Result<&Path, SessionError> {
        if self.state.is_recording() {
            return Err(RecorderStateError::InvalidTransition {
                from: SessionState::Recording,
                action: RecorderAction::Start,
            }
            .into());
        }

        let dir = self
            .output_root
            .join(format!("recording_{}", wall.timestamp_millis()));
        std::fs::create_dir_all(&dir)?;

        self.state.start()?;
        self.steps.clear();
        self.start_time = Some(at);
        Ok(self.output_dir.insert(dir).as_path())
    }

    /// Recording → Idle. Steps are kept for emission until the next `begin`.
    pub fn end(&mut self) -> Result<(), SessionError> {
        self.state.stop()?;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state.current_state()
    }

    /// What a toggle key release would do right now.
    pub fn toggle_action(&self) -> RecorderAction {
        self.state.toggle_action()
    }

    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn get_steps(&self) -> &[RecordedStep] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordedStep> {
        self.steps.iter()
    }

    pub fn last_step(&self) -> Option<&RecordedStep> {
        self.steps.last()
    }

    /// Append a step unless it repeats the occurrence behind the last step.
    ///
    /// Only the most recent step is consulted. Steps without a source event
    /// (screenshots) are always appended. Returns whether the step was kept.
    pub fn add_step(&mut self, mut step: RecordedStep) -> bool {
        if let Some(last) = self.steps.last() {
            if step.source.is_some() && last.source == step.source {
                log::debug!("coalesced repeated delivery of {:?}", step.source);
                return false;
            }
            if step.at < last.at {
                log::debug!("clamping out-of-order step to previous timestamp");
                step.at = last.at;
            }
        }
        self.steps.push(step);
        true
    }

    /// Path for a screenshot taken at `wall`, unique within this session.
    pub fn screenshot_path(&self, wall: DateTime<Utc>) -> Option<PathBuf> {
        let dir = self.output_dir.as_ref()?;
        let stem = format!("screenshot_{}", wall.timestamp());
        let mut path = dir.join(format!("{stem}.png"));
        let mut n = 1;
        while path.exists() {
            path = dir.join(format!("{stem}_{n}.png"));
            n += 1;
        }
        Some(path)
    }
}
