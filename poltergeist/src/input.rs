//! The seam between the core and whatever produces button presses (a keyboard handler, a gamepad,
//! a replay file, a test).

use serde::Deserialize;
use serde::Serialize;

/// A snapshot of the pressed buttons. A set bit means "pressed". The bit layout matches the pad
/// byte of replay files so frames can be fed in without translation.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::BitOr,
    derive_more::BitOrAssign,
    derive_more::BitAnd,
    derive_more::From,
)]
pub struct Buttons(pub u8);

impl Buttons {
    pub const NONE: Self = Self(0x00);
    pub const A: Self = Self(0x01);
    pub const B: Self = Self(0x02);
    pub const SELECT: Self = Self(0x04);
    pub const START: Self = Self(0x08);
    pub const RIGHT: Self = Self(0x10);
    pub const LEFT: Self = Self(0x20);
    pub const UP: Self = Self(0x40);
    pub const DOWN: Self = Self(0x80);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The active-low nibble seen through P1 when the action buttons are selected.
    /// Bit 0 is A, then B, Select, and Start.
    pub const fn button_nibble(self) -> u8 {
        !self.0 & 0x0F
    }

    /// The active-low nibble seen through P1 when the d-pad is selected.
    /// Bit 0 is Right, then Left, Up, and Down. Opposing directions cancel out.
    pub const fn direction_nibble(self) -> u8 {
        let mut pressed = self.0 >> 4;
        if pressed & 0b0011 == 0b0011 {
            pressed &= !0b0011;
        }
        if pressed & 0b1100 == 0b1100 {
            pressed &= !0b1100;
        }
        !pressed & 0x0F
    }
}

/// Anything that can report which buttons are currently held.
pub trait JoypadInput {
    fn pressed(&self) -> Buttons;
}

impl JoypadInput for Buttons {
    fn pressed(&self) -> Buttons {
        *self
    }
}

impl<T: JoypadInput + ?Sized> JoypadInput for &T {
    fn pressed(&self) -> Buttons {
        (**self).pressed()
    }
}
