use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderAction {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderStateError {
    InvalidTransition {
        from: SessionState,
        action: RecorderAction,
    },
}

impl std::fmt::Display for RecorderStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderStateError::InvalidTransition { from, action } => {
                write!(f, "cannot {action:?} while {from:?}")
            }
        }
    }
}

impl std::error::Error for RecorderStateError {}

#[derive(Debug, Clone)]
pub struct RecorderState {
    state: SessionState,
}

impl Default for RecorderState {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderState {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    fn transition(
        &mut self,
        allowed: &[SessionState],
        to: SessionState,
        action: RecorderAction,
    ) -> Result<(), RecorderStateError> {
        if allowed.contains(&self.state) {
            self.state = to;
            Ok(())
        } else {
            Err(RecorderStateError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    pub fn start(&mut self) -> Result<(), RecorderStateError> {
        self.transition(
            &[SessionState::Idle],
            SessionState::Recording,
            RecorderAction::Start,
        )
    }

    pub fn stop(&mut self) -> Result<(), RecorderStateError> {
        self.transition(
            &[SessionState::Recording],
            SessionState::Idle,
            RecorderAction::Stop,
        )
    }

    /// The action the toggle hot key would perform from the current state.
    pub fn toggle_action(&self) -> RecorderAction {
        match self.state {
            SessionState::Idle => RecorderAction::Start,
            SessionState::Recording => RecorderAction::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_stop_flow() {
        let mut state = RecorderState::new();
        assert_eq!(state.toggle_action(), RecorderAction::Start);
        assert!(state.start().is_ok());
        assert!(state.is_recording());
        assert_eq!(state.toggle_action(), RecorderAction::Stop);
        assert!(state.stop().is_ok());
        assert_eq!(state.current_state(), SessionState::Idle);
    }

    #[test]
    fn cannot_stop_when_idle() {
        let mut state = RecorderState::new();
        assert_eq!(
            state.stop(),
            Err(RecorderStateError::InvalidTransition {
                from: SessionState::Idle,
                action: RecorderAction::Stop,
            })
        );
    }

    #[test]
    fn cannot_start_twice() {
        let mut state = RecorderState::new();
        state.start().unwrap();
        assert!(state.start().is_err());
    }
}
