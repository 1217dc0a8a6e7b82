use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    NoActiveWindow,
    NotVisible,
    NotFound(String),
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::NoActiveWindow => write!(f, "no active window"),
            WindowError::NotVisible => write!(f, "window not visible"),
            WindowError::NotFound(name) => write!(f, "{name} not found"),
        }
    }
}

impl std::error::Error for WindowError {}

/// The frontmost window as observed when an event arrived.
///
/// Coordinates recorded against a context stay valid after the window moves,
/// because the origin is captured once and never re-queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowContext {
    pub name: Option<String>,
    pub origin_x: i32,
    pub origin_y: i32,
}

impl WindowContext {
    pub fn new(name: Option<String>, origin_x: i32, origin_y: i32) -> Self {
        Self {
            name,
            origin_x,
            origin_y,
        }
    }

    pub fn to_relative(&self, x: i32, y: i32) -> (i32, i32) {
        (x - self.origin_x, y - self.origin_y)
    }

    pub fn to_screen(&self, x: i32, y: i32) -> (i32, i32) {
        (x + self.origin_x, y + self.origin_y)
    }

    #[cfg(test)]
    pub fn sample() -> Self {
        Self::new(Some("MainWindow".to_string()), 100, 100)
    }
}

/// Finds the frontmost window of the application under test.
pub trait WindowLocator {
    fn current_window(&self) -> Option<WindowContext>;
}

/// Locator for hosts without window information; coordinates stay absolute.
pub struct NoWindow;

impl WindowLocator for NoWindow {
    fn current_window(&self) -> Option<WindowContext> {
        None
    }
}

impl<F> WindowLocator for F
where
    F: Fn() -> Option<WindowContext>,
{
    fn current_window(&self) -> Option<WindowContext> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_and_screen_are_inverse() {
        let ctx = WindowContext::sample();
        assert_eq!(ctx.to_relative(186, 249), (86, 149));
        assert_eq!(ctx.to_screen(86, 149), (186, 249));
    }

    #[test]
    fn window_context_serializes() {
        let json = serde_json::to_string(&WindowContext::sample()).unwrap();
        assert!(json.contains("MainWindow"));
    }

    #[test]
    fn closure_acts_as_locator() {
        let locator = || Some(WindowContext::new(None, 5, 7));
        assert_eq!(locator.current_window().map(|w| w.origin_x), Some(5));
        assert!(NoWindow.current_window().is_none());
    }
}
