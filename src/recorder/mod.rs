pub mod capture;
pub mod dispatch;
pub mod input_event;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod storage;
pub mod types;
pub mod window_info;

pub use pipeline::{Recorder, RecorderOutcome};
pub use session::RecordingSession;
