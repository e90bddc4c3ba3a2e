use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
/// Fault kinds raised while decoding or executing instructions.
///
/// Every substrate surfaces these to its driver; none is swallowed.
pub enum Fault {
    /// Fetch reached an address with no mapped instruction.
    InvalidPc = 0x00,
    /// POP or RET found the stack empty.
    StackUnderflow = 0x01,
    /// A decoded register index fell outside the register bank.
    InvalidRegister = 0x02,
    /// DIV read a zero divisor.
    DivisionByZero = 0x03,
    /// The decoded opcode is not assigned in the instruction table.
    UnknownOpcode = 0x04,
    /// A bulk load would run past the end of backing memory.
    MemoryOutOfRange = 0x05,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
