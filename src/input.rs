use glam::Vec2;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
}

/// Non-character keys the application reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Escape,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Modifier keys held while an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };

    pub const META: Self = Self {
        meta: true,
        ..Self::NONE
    };
}

/// Input the application reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { button: MouseButton, position: Vec2 },
    PointerMove { position: Vec2 },
    PointerUp { button: MouseButton },
    /// Vertical wheel movement in pixels; positive when scrolling down.
    Wheel { delta: f32, modifiers: Modifiers },
    KeyDown { key: KeyCode },
    Resize { width: u32, height: u32 },
}

/// Tracks the left-button drag used to orbit the camera.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerDrag {
    last: Option<Vec2>,
}

impl PointerDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.last.is_some()
    }

    pub fn begin(&mut self, position: Vec2) {
        self.last = Some(position);
    }

    pub fn end(&mut self) {
        self.last = None;
    }

    /// Returns the movement since the previous position while dragging.
    /// Zero-length moves leave the anchor untouched.
    pub fn advance(&mut self, position: Vec2) -> Option<Vec2> {
        let last = self.last?;
        let delta = position - last;
        if delta == Vec2::ZERO {
            return None;
        }
        self.last = Some(position);
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_reports_deltas_only_while_pressed() {
        let mut drag = PointerDrag::new();
        assert_eq!(drag.advance(Vec2::new(5.0, 5.0)), None);
        drag.begin(Vec2::new(10.0, 10.0));
        assert_eq!(drag.advance(Vec2::new(10.0, 10.0)), None);
        assert_eq!(drag.advance(Vec2::new(13.0, 6.0)), Some(Vec2::new(3.0, -4.0)));
        assert_eq!(drag.advance(Vec2::new(14.0, 6.0)), Some(Vec2::new(1.0, 0.0)));
        drag.end();
        assert!(!drag.is_active());
        assert_eq!(drag.advance(Vec2::new(20.0, 20.0)), None);
    }
}
