use super::input_event::{EventId, Phase, PointerButton};
use super::window_info::WindowContext;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    Absolute,
    #[default]
    Relative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Key {
        code: u32,
        phase: Phase,
        window: Option<WindowContext>,
    },
    Pointer {
        x: i32,
        y: i32,
        button: PointerButton,
        phase: Phase,
        window: Option<WindowContext>,
    },
    Motion {
        x: i32,
        y: i32,
        window: Option<WindowContext>,
    },
    Wheel {
        rotation: i32,
        window: Option<WindowContext>,
    },
    Screenshot {
        file: PathBuf,
    },
}

/// One recorded action. Immutable once appended to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStep {
    pub at: Instant,
    /// The event this step was derived from; `None` for screenshots.
    pub source: Option<EventId>,
    pub kind: StepKind,
}

impl RecordedStep {
    pub fn screenshot(file: PathBuf, at: Instant) -> Self {
        Self {
            at,
            source: None,
            kind: StepKind::Screenshot { file },
        }
    }

    pub fn window(&self) -> Option<&WindowContext> {
        match &self.kind {
            StepKind::Key { window, .. }
            | StepKind::Pointer { window, .. }
            | StepKind::Motion { window, .. }
            | StepKind::Wheel { window, .. } => window.as_ref(),
            StepKind::Screenshot { .. } => None,
        }
    }

    pub fn screen_position(&self) -> Option<(i32, i32)> {
        match self.kind {
            StepKind::Pointer { x, y, .. } | StepKind::Motion { x, y, .. } => Some((x, y)),
            _ => None,
        }
    }

    /// Position relative to the window captured with the step.
    ///
    /// Falls back to the screen position when no window was active.
    pub fn relative_position(&self) -> Option<(i32, i32)> {
        let (x, y) = self.screen_position()?;
        Some(match self.window() {
            Some(window) => window.to_relative(x, y),
            None => (x, y),
        })
    }

    pub fn window_name(&self) -> Option<&str> {
        self.window().and_then(|w| w.name.as_deref())
    }

    #[cfg(test)]
    pub fn sample(at: Instant) -> Self {
        Self {
            at,
            source: Some(EventId::next()),
            kind: StepKind::Pointer {
                x: 229,
                y: 146,
                button: PointerButton::Primary,
                phase: Phase::Pressed,
                window: Some(WindowContext::sample()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_position_subtracts_origin() {
        let step = RecordedStep::sample(Instant::now());
        assert_eq!(step.screen_position(), Some((229, 146)));
        assert_eq!(step.relative_position(), Some((129, 46)));
        assert_eq!(step.window_name(), Some("MainWindow"));
    }

    #[test]
    fn relative_position_without_window_is_raw() {
        let step = RecordedStep {
            at: Instant::now(),
            source: Some(EventId::next()),
            kind: StepKind::Motion {
                x: 40,
                y: 50,
                window: None,
            },
        };
        assert_eq!(step.relative_position(), Some((40, 50)));
    }

    #[test]
    fn screenshot_has_no_source_or_position() {
        let step = RecordedStep::screenshot(PathBuf::from("screenshot_1.png"), Instant::now());
        assert!(step.source.is_none());
        assert!(step.window().is_none());
        assert!(step.relative_position().is_none());
    }
}
