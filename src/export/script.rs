//! Turns a finished recording into an ordered list of playback instructions.

use crate::recorder::input_event::{Phase, PointerButton};
use crate::recorder::session::RecordingSession;
use crate::recorder::types::{RecordedStep, RecordingMode, StepKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

pub const SCRIPT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitOptions {
    pub mode: RecordingMode,
    pub auto_raise: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "space", rename_all = "snake_case")]
pub enum Position {
    Screen { x: i32, y: i32 },
    /// Offset from the origin of the active window at playback time.
    Window { x: i32, y: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    WaitForWindow,
    Delay {
        ms: u64,
    },
    Key {
        phase: Phase,
        code: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raise: Option<String>,
    },
    Wheel {
        amount: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raise: Option<String>,
    },
    Move {
        to: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raise: Option<String>,
    },
    Button {
        phase: Phase,
        button: PointerButton,
        at: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raise: Option<String>,
    },
    Compare {
        file: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub version: u32,
    pub mode: RecordingMode,
    pub instructions: Vec<Instruction>,
}

impl Script {
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Total recorded delay in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.instructions
            .iter()
            .map(|i| match i {
                Instruction::Delay { ms } => *ms,
                _ => 0,
            })
            .sum()
    }
}

/// Build the playback script for a recording.
///
/// Every step becomes a delay (time since the previous step, or since the
/// recording started for the first one) followed by one instruction.
pub fn build_script(session: &RecordingSession, options: &EmitOptions) -> Script {
    let mut instructions = vec![Instruction::WaitForWindow];
    let mut working_time: Option<Instant> = session.start_time();

    for step in session.iter() {
        let since = working_time.unwrap_or(step.at);
        let ms = step.at.saturating_duration_since(since).as_millis() as u64;
        instructions.push(Instruction::Delay { ms });
        instructions.push(step_instruction(step, options));
        working_time = Some(step.at);
    }

    Script {
        version: SCRIPT_VERSION,
        mode: options.mode,
        instructions,
    }
}

fn step_instruction(step: &RecordedStep, options: &EmitOptions) -> Instruction {
    let raise = raise_target(step, options);
    match &step.kind {
        StepKind::Key { code, phase, .. } => Instruction::Key {
            phase: *phase,
            code: *code,
            raise,
        },
        StepKind::Wheel { rotation, .. } => Instruction::Wheel {
            amount: *rotation,
            raise,
        },
        StepKind::Motion { x, y, .. } => Instruction::Move {
            to: position(step, *x, *y, options.mode),
            raise,
        },
        StepKind::Pointer {
            x, y, button, phase, ..
        } => Instruction::Button {
            phase: *phase,
            button: *button,
            at: position(step, *x, *y, options.mode),
            raise,
        },
        StepKind::Screenshot { file } => Instruction::Compare {
            file: file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string()),
            threshold: None,
        },
    }
}

fn raise_target(step: &RecordedStep, options: &EmitOptions) -> Option<String> {
    if options.auto_raise && options.mode == RecordingMode::Relative {
        step.window_name().map(str::to_string)
    } else {
        None
    }
}

fn position(step: &RecordedStep, x: i32, y: i32, mode: RecordingMode) -> Position {
    match (mode, step.window(), step.relative_position()) {
        (RecordingMode::Relative, Some(_), Some((x, y))) => Position::Window { x, y },
        _ => Position::Screen { x, y },
    }
}

fn phase_verb(phase: Phase) -> &'static str {
    match phase {
        Phase::Pressed => "press",
        Phase::Released => "release",
    }
}

fn write_raise(f: &mut fmt::Formatter<'_>, raise: &Option<String>) -> fmt::Result {
    match raise {
        Some(name) => write!(f, " @{name:?}"),
        None => Ok(()),
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Screen { x, y } => write!(f, "{x} {y}"),
            Position::Window { x, y } => write!(f, "{x:+} {y:+}"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::WaitForWindow => write!(f, "wait_for_window"),
            Instruction::Delay { ms } => write!(f, "delay {ms}"),
            Instruction::Key {
                phase,
                code,
                raise: target,
            } => {
                write!(f, "key_{} {code}", phase_verb(*phase))?;
                write_raise(f, target)
            }
            Instruction::Wheel {
                amount,
                raise: target,
            } => {
                write!(f, "mouse_wheel {amount}")?;
                write_raise(f, target)
            }
            Instruction::Move { to, raise: target } => {
                write!(f, "mouse_move {to}")?;
                write_raise(f, target)
            }
            Instruction::Button {
                phase,
                button,
                at,
                raise: target,
            } => {
                write!(f, "mouse_{} {at} {button:?}", phase_verb(*phase))?;
                write_raise(f, target)
            }
            Instruction::Compare { file, threshold } => {
                write!(f, "compare {file:?}")?;
                match threshold {
                    Some(t) => write!(f, " {t}"),
                    None => Ok(()),
                }
            }
        }
    }
}
