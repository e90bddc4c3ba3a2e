//! Opcode table of the instruction set.

use crate::Fault;

use core::fmt;

use consts::*;

/// Byte values of the opcode tags.
pub mod consts {
    /// No operation.
    pub const OP_NOP: u8 = 0x00;
    /// Function call.
    pub const OP_CALL: u8 = 0x01;
    /// Return from function.
    pub const OP_RET: u8 = 0x02;
    /// Halt the CPU.
    pub const OP_HALT: u8 = 0x03;
    /// Push register to stack.
    pub const OP_PUSH: u8 = 0x04;
    /// Pop from stack to register.
    pub const OP_POP: u8 = 0x05;
    /// Branch if the zero flag is set.
    pub const OP_BEQ: u8 = 0x06;
    /// Compare two registers.
    pub const OP_CMP: u8 = 0x07;
    /// Addition.
    pub const OP_ADD: u8 = 0x08;
    /// Subtraction.
    pub const OP_SUB: u8 = 0x09;
    /// Multiplication.
    pub const OP_MUL: u8 = 0x0a;
    /// Truncating division.
    pub const OP_DIV: u8 = 0x0b;
    /// Load word from memory.
    pub const OP_LOAD: u8 = 0x0c;
    /// Move immediate to register.
    pub const OP_MOV: u8 = 0x0d;
    /// Bitwise exclusive or.
    pub const OP_XOR: u8 = 0x0e;
    /// Bitwise and.
    pub const OP_AND: u8 = 0x0f;
    /// Store word to memory. Widened 5-bit tag; see [`crate::Opcode::STORE`].
    pub const OP_STORE: u8 = 0x10;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
/// Opcode representation for the simulator.
///
/// Every variant except [`Opcode::STORE`] occupies one value of the 4-bit
/// primary opcode field.
pub enum Opcode {
    /// No effect.
    NOP = OP_NOP,
    /// Push the advanced PC, then jump to the immediate address.
    CALL = OP_CALL,
    /// Pop the return address into PC.
    RET = OP_RET,
    /// Latch the halt bit; the interpreter refuses further steps.
    HALT = OP_HALT,
    /// Push `regs[rd]` onto the stack.
    PUSH = OP_PUSH,
    /// Pop the stack top into `regs[rd]`.
    POP = OP_POP,
    /// If Z: `pc ← (pc − 4) + sign_extend_16(imm)`.
    BEQ = OP_BEQ,
    /// Set Z, N, C from `regs[rs] − regs[rt]` without writing a register.
    CMP = OP_CMP,
    /// `regs[rd] ← regs[rs] + regs[rt]`; C is the carry out of bit 31.
    ADD = OP_ADD,
    /// `regs[rd] ← regs[rs] − regs[rt]`; C is the borrow flag.
    SUB = OP_SUB,
    /// `regs[rd] ← regs[rs] × regs[rt]`; C set when the full product
    /// exceeds 32 bits.
    MUL = OP_MUL,
    /// `regs[rd] ← regs[rs] ÷ regs[rt]`, truncating; faults on a zero
    /// divisor. Leaves C untouched.
    DIV = OP_DIV,
    /// `regs[rd] ← MEM[regs[rs] + imm]`.
    LOAD = OP_LOAD,
    /// `regs[rd] ← sign_extend_16(imm)`.
    MOV = OP_MOV,
    /// `regs[rd] ← regs[rs] XOR regs[rt]`. Leaves C untouched.
    XOR = OP_XOR,
    /// `regs[rd] ← regs[rs] AND regs[rt]`. Leaves C untouched.
    AND = OP_AND,
    /// `MEM[regs[rs]] ← regs[rt]`.
    ///
    /// The tag value `0b10000` overflows the 4-bit opcode field, so the
    /// codec encodes STORE on the reserved `0b0000` page with `0xF` in the
    /// otherwise-unused `rd` field. Only the assembler helper
    /// [`crate::make_instruction`] produces that encoding.
    STORE = OP_STORE,
}

impl Opcode {
    /// Assembly mnemonic of the opcode.
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::NOP => "NOP",
            Self::CALL => "CALL",
            Self::RET => "RET",
            Self::HALT => "HALT",
            Self::PUSH => "PUSH",
            Self::POP => "POP",
            Self::BEQ => "BEQ",
            Self::CMP => "CMP",
            Self::ADD => "ADD",
            Self::SUB => "SUB",
            Self::MUL => "MUL",
            Self::DIV => "DIV",
            Self::LOAD => "LOAD",
            Self::MOV => "MOV",
            Self::XOR => "XOR",
            Self::AND => "AND",
            Self::STORE => "STORE",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Fault;

    fn try_from(value: u8) -> Result<Self, Fault> {
        match value {
            OP_NOP => Ok(Self::NOP),
            OP_CALL => Ok(Self::CALL),
            OP_RET => Ok(Self::RET),
            OP_HALT => Ok(Self::HALT),
            OP_PUSH => Ok(Self::PUSH),
            OP_POP => Ok(Self::POP),
            OP_BEQ => Ok(Self::BEQ),
            OP_CMP => Ok(Self::CMP),
            OP_ADD => Ok(Self::ADD),
            OP_SUB => Ok(Self::SUB),
            OP_MUL => Ok(Self::MUL),
            OP_DIV => Ok(Self::DIV),
            OP_LOAD => Ok(Self::LOAD),
            OP_MOV => Ok(Self::MOV),
            OP_XOR => Ok(Self::XOR),
            OP_AND => Ok(Self::AND),
            OP_STORE => Ok(Self::STORE),
            _ => Err(Fault::UnknownOpcode),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
