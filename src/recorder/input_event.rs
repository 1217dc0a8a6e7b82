use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one physical input occurrence.
///
/// A listener that is re-entered for the same occurrence hands the engine the
/// same id twice; the session uses it to drop the repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl EventId {
    pub fn next() -> Self {
        Self(NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Primary,
    Secondary,
    Tertiary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    Key {
        code: u32,
        phase: Phase,
    },
    MouseButton {
        x: i32,
        y: i32,
        button: PointerButton,
        phase: Phase,
    },
    MouseMotion {
        x: i32,
        y: i32,
    },
    MouseWheel {
        rotation: i32,
    },
}

/// A raw event as delivered by the host toolkit, stamped on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub id: EventId,
    pub at: Instant,
    pub kind: InputEventKind,
}

impl InputEvent {
    pub fn new(kind: InputEventKind, at: Instant) -> Self {
        Self {
            id: EventId::next(),
            at,
            kind,
        }
    }

    pub fn key(code: u32, phase: Phase, at: Instant) -> Self {
        Self::new(InputEventKind::Key { code, phase }, at)
    }

    pub fn button(x: i32, y: i32, button: PointerButton, phase: Phase, at: Instant) -> Self {
        Self::new(
            InputEventKind::MouseButton {
                x,
                y,
                button,
                phase,
            },
            at,
        )
    }

    pub fn motion(x: i32, y: i32, at: Instant) -> Self {
        Self::new(InputEventKind::MouseMotion { x, y }, at)
    }

    pub fn wheel(rotation: i32, at: Instant) -> Self {
        Self::new(InputEventKind::MouseWheel { rotation }, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_get_distinct_ids() {
        let now = Instant::now();
        let a = InputEvent::key(65, Phase::Pressed, now);
        let b = InputEvent::key(65, Phase::Pressed, now);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn redelivered_event_keeps_identity() {
        let event = InputEvent::motion(10, 20, Instant::now());
        let copy = event;
        assert_eq!(event.id, copy.id);
        assert_eq!(copy.kind, InputEventKind::MouseMotion { x: 10, y: 20 });
    }
}
