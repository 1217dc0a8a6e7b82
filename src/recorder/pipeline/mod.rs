//! Recording pipeline: raw input event → window context → recorded step.
//!
//! This module connects the pieces of the recording flow:
//! - Watches the toggle and screenshot hot keys and drives the session state
//! - Samples mouse motion at a fixed interval
//! - Stamps every other event with the frontmost window and appends it
//! - Writes the script when the recording stops

mod types;

pub use types::*;

use super::capture::{capture_to_file, ScreenCapture};
use super::input_event::{InputEvent, InputEventKind, Phase};
use super::session::RecordingSession;
use super::state::RecorderAction;
use super::types::{RecordedStep, StepKind};
use super::window_info::WindowLocator;
use crate::config::RecorderConfig;
use crate::export::{self, EmitOptions};

use std::time::Instant;

pub struct Recorder {
    config: RecorderConfig,
    capture: Box<dyn ScreenCapture>,
    windows: Box<dyn WindowLocator>,
    clock: Box<dyn Clock>,
    state: PipelineState,
}

impl Recorder {
    pub fn new(
        config: RecorderConfig,
        capture: Box<dyn ScreenCapture>,
        windows: Box<dyn WindowLocator>,
    ) -> Self {
        Self {
            config,
            capture,
            windows,
            clock: Box::new(SystemClock),
            state: PipelineState::new(),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn new_session(&self) -> RecordingSession {
        RecordingSession::new(self.config.output_root.clone())
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            mode: self.config.mode,
            auto_raise: self.config.auto_raise,
        }
    }

    /// Feed one event through the engine.
    ///
    /// Errors never abort a recording: a failed screenshot leaves the session
    /// recording, and a failed script write happens after the session is
    /// already idle.
    pub fn handle_event(
        &mut self,
        session: &mut RecordingSession,
        event: &InputEvent,
    ) -> Result<RecorderOutcome, PipelineError> {
        match event.kind {
            InputEventKind::Key { code, phase } => {
                let outcome = self.handle_key(session, event, code, phase);
                self.state.reopen_motion_gate();
                outcome
            }
            InputEventKind::MouseMotion { .. } => Ok(self.handle_motion(session, event)),
            InputEventKind::MouseButton { .. } | InputEventKind::MouseWheel { .. } => {
                Ok(self.record(session, event))
            }
        }
    }

    fn handle_key(
        &mut self,
        session: &mut RecordingSession,
        event: &InputEvent,
        code: u32,
        phase: Phase,
    ) -> Result<RecorderOutcome, PipelineError> {
        match phase {
            Phase::Pressed if self.config.is_hot_key(code) => Ok(RecorderOutcome::Ignored),
            Phase::Pressed => Ok(self.record(session, event)),
            Phase::Released if code == self.config.toggle_key => match session.toggle_action() {
                RecorderAction::Start => self.start(session, event.at),
                RecorderAction::Stop => self.stop(session),
            },
            Phase::Released if code == self.config.screenshot_key => {
                if session.is_recording() {
                    self.take_screenshot(session, event.at)
                } else {
                    Ok(RecorderOutcome::Ignored)
                }
            }
            Phase::Released => Ok(self.record(session, event)),
        }
    }

    fn handle_motion(
        &mut self,
        session: &mut RecordingSession,
        event: &InputEvent,
    ) -> RecorderOutcome {
        if !session.is_recording() {
            return RecorderOutcome::Ignored;
        }
        if !self
            .state
            .motion_gate_open(event.at, self.config.motion_sample_interval())
        {
            return RecorderOutcome::Throttled;
        }
        self.state.last_motion = Some(event.at);
        self.record(session, event)
    }

    fn start(
        &mut self,
        session: &mut RecordingSession,
        at: Instant,
    ) -> Result<RecorderOutcome, PipelineError> {
        let dir = session.begin(at, self.clock.wall_time())?.to_path_buf();
        self.state.reset();
        log::info!("Start recording into {}", dir.display());
        Ok(RecorderOutcome::Started { dir })
    }

    fn stop(&mut self, session: &mut RecordingSession) -> Result<RecorderOutcome, PipelineError> {
        session.end()?;
        self.state.reset();
        log::info!("Stop recording ({} steps)", session.get_steps().len());

        let script = export::write_recording(session, &self.emit_options())?;
        log::info!("Done writing test script {}", script.display());
        Ok(RecorderOutcome::Stopped { script })
    }

    fn take_screenshot(
        &mut self,
        session: &mut RecordingSession,
        at: Instant,
    ) -> Result<RecorderOutcome, PipelineError> {
        let file = session
            .screenshot_path(self.clock.wall_time())
            .ok_or(PipelineError::NoOutputDir)?;

        if let Err(err) = capture_to_file(self.capture.as_ref(), &file) {
            log::error!("Screenshot {} skipped: {err}", file.display());
            return Err(err.into());
        }

        log::debug!("Captured {}", file.display());
        session.add_step(RecordedStep::screenshot(file.clone(), at));
        Ok(RecorderOutcome::ScreenshotSaved { file })
    }

    fn record(&mut self, session: &mut RecordingSession, event: &InputEvent) -> RecorderOutcome {
        if !session.is_recording() {
            return RecorderOutcome::Ignored;
        }

        let window = self.windows.current_window();
        let kind = match event.kind {
            InputEventKind::Key { code, phase } => StepKind::Key {
                code,
                phase,
                window,
            },
            InputEventKind::MouseButton {
                x,
                y,
                button,
                phase,
            } => StepKind::Pointer {
                x,
                y,
                button,
                phase,
                window,
            },
            InputEventKind::MouseMotion { x, y } => StepKind::Motion { x, y, window },
            InputEventKind::MouseWheel { rotation } => StepKind::Wheel { rotation, window },
        };

        let step = RecordedStep {
            at: event.at,
            source: Some(event.id),
            kind,
        };
        if session.add_step(step) {
            RecorderOutcome::Recorded
        } else {
            RecorderOutcome::Coalesced
        }
    }
}
