use serde::Deserialize;
use serde::Serialize;

/// An interrupt source. The discriminant is the vector the CPU jumps to when servicing it.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[display("{_variant}")]
#[repr(u16)]
pub enum InterruptOp {
    #[display("VBlank")]
    VBlank = 0x0040,
    #[display("LCD")]
    LCD = 0x0048,
    #[display("Timer")]
    Timer = 0x0050,
    #[display("Serial")]
    Serial = 0x0058,
    #[display("Joypad")]
    Joypad = 0x0060,
}

impl InterruptOp {
    /// Interrupt sources in the order they are serviced when several are pending.
    pub const PRIORITY: [Self; 5] = [
        Self::VBlank,
        Self::LCD,
        Self::Timer,
        Self::Serial,
        Self::Joypad,
    ];

    /// The bit for this source in IE and IF.
    pub const fn mask(self) -> u8 {
        match self {
            InterruptOp::VBlank => 0x01,
            InterruptOp::LCD => 0x02,
            InterruptOp::Timer => 0x04,
            InterruptOp::Serial => 0x08,
            InterruptOp::Joypad => 0x10,
        }
    }

    pub const fn vector(self) -> u16 {
        self as u16
    }
}
