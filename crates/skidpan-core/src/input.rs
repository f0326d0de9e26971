use serde::{Deserialize, Serialize};

/// Which control keys are held for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub left: bool,
    pub right: bool,
    pub brake: bool,
}

impl InputSnapshot {
    pub const NONE: Self = Self {
        left: false,
        right: false,
        brake: false,
    };

    /// Whether any steering key is held.
    pub fn steering(&self) -> bool {
        self.left || self.right
    }
}

/// Control keys the simulation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Left,
    Right,
    Brake,
}

/// Supplies the input snapshot before each tick.
pub trait InputProvider {
    fn poll(&mut self) -> InputSnapshot;
}

/// Collects key edges between polls.
///
/// A key counts as held for the next poll if it is currently down or was
/// pressed at any point since the previous poll, so a tap shorter than one
/// tick is never lost.
#[derive(Debug, Clone, Default)]
pub struct InputLatch {
    held: InputSnapshot,
    pressed: InputSnapshot,
}

impl InputLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        *slot(&mut self.held, key) = true;
        *slot(&mut self.pressed, key) = true;
    }

    pub fn release(&mut self, key: Key) {
        *slot(&mut self.held, key) = false;
    }

    /// Keys physically down right now, ignoring latched taps.
    pub fn held(&self) -> InputSnapshot {
        self.held
    }
}

impl InputProvider for InputLatch {
    fn poll(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            left: self.held.left || self.pressed.left,
            right: self.held.right || self.pressed.right,
            brake: self.held.brake || self.pressed.brake,
        };
        self.pressed = InputSnapshot::NONE;
        snapshot
    }
}

fn slot(snapshot: &mut InputSnapshot, key: Key) -> &mut bool {
    match key {
        Key::Left => &mut snapshot.left,
        Key::Right => &mut snapshot.right,
        Key::Brake => &mut snapshot.brake,
    }
}
