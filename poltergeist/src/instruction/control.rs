#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum ControlOp {
    #[display("HALT")]
    Halt,
    #[display("NOP")]
    Nop,
    /// Takes a padding byte. Treated as a four cycle no-op since there is no low power state to
    /// enter.
    #[display("STOP")]
    Stop,
}

impl ControlOp {
    /// The base cost in clock cycles.
    pub fn cycles(&self) -> u8 {
        4
    }

    /// The encoded length in bytes, op code and operands included.
    pub const fn size(&self) -> u8 {
        match self {
            ControlOp::Nop => 1,
            ControlOp::Stop => 2,
            ControlOp::Halt => 1,
        }
    }
}
