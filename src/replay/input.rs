//! Capabilities the runner drives: synthetic input and window management.

use crate::recorder::input_event::PointerButton;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectError(pub String);

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input injection failed: {}", self.0)
    }
}

impl std::error::Error for InjectError {}

/// Synthesizes OS-level input at screen coordinates.
pub trait InputInjector {
    fn press_key(&self, code: u32) -> Result<(), InjectError>;
    fn release_key(&self, code: u32) -> Result<(), InjectError>;
    fn move_cursor(&self, x: i32, y: i32) -> Result<(), InjectError>;
    fn press_button(&self, button: PointerButton) -> Result<(), InjectError>;
    fn release_button(&self, button: PointerButton) -> Result<(), InjectError>;
    /// Positive amounts scroll toward the user.
    fn scroll(&self, amount: i32) -> Result<(), InjectError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub name: Option<String>,
    pub origin_x: i32,
    pub origin_y: i32,
    /// Has keyboard focus.
    pub active: bool,
    pub visible: bool,
}

impl WindowInfo {
    pub fn to_screen(&self, x: i32, y: i32) -> (i32, i32) {
        (self.origin_x + x, self.origin_y + y)
    }
}

/// Window queries and focus control of the application under test.
pub trait WindowControl {
    fn active_window(&self) -> Option<WindowInfo>;
    fn window_named(&self, name: &str) -> Option<WindowInfo>;
    fn bring_to_front(&self, name: &str);
}
