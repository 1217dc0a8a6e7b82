use super::input::InjectError;
use crate::compare::AssertionFailure;
use crate::recorder::capture::CaptureError;
use crate::recorder::window_info::WindowError;
use std::fmt;
use std::time::Duration;

/// Failures that stop a replay outright.
#[derive(Debug)]
pub enum ReplayError {
    Window(WindowError),
    /// No window became active within the configured wait.
    WaitForWindowTimedOut(Duration),
    Inject(InjectError),
    /// The UI thread went away while draining events.
    Dispatch(CaptureError),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Window(err) => write!(f, "{err}"),
            ReplayError::WaitForWindowTimedOut(waited) => {
                write!(
                    f,
                    "no window became active within {} ms",
                    waited.as_millis()
                )
            }
            ReplayError::Inject(err) => write!(f, "{err}"),
            ReplayError::Dispatch(err) => write!(f, "event dispatch failed: {err}"),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<WindowError> for ReplayError {
    fn from(err: WindowError) -> Self {
        ReplayError::Window(err)
    }
}

impl From<InjectError> for ReplayError {
    fn from(err: InjectError) -> Self {
        ReplayError::Inject(err)
    }
}

/// Outcome of a completed replay. Assertion failures are collected here
/// instead of stopping the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    pub executed: usize,
    pub comparisons: usize,
    pub recaptured: Vec<String>,
    failures: Vec<AssertionFailure>,
}

impl ReplayReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_failure(&mut self, failure: AssertionFailure) {
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} instructions, {} comparisons, {} recaptured, {} failed",
            self.executed,
            self.comparisons,
            self.recaptured.len(),
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}
