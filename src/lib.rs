//! Record-and-replay UI testing.
//!
//! [`recorder`] turns raw input into a timestamped step list, [`export`]
//! emits it as a playback script, [`replay`] drives it back against the
//! application and checks screenshots with [`compare`].

pub mod compare;
pub mod config;
pub mod export;
pub mod recorder;
pub mod replay;

pub use compare::{CapturePolicy, Comparator, ComparisonResult};
pub use config::{Config, RecorderConfig, ReplayConfig};
pub use export::{build_script, EmitOptions, Instruction, Position, Script};
pub use recorder::{Recorder, RecorderOutcome, RecordingSession};
pub use replay::{ReplayError, ReplayReport, Runner};
