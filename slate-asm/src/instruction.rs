//! Packed-word instruction codec.

use crate::opcode::consts::*;
use crate::{Fault, Immediate16, Opcode, RegisterId, Word};

use core::fmt;

/// `rd`-field marker selecting STORE on the reserved `0b0000` opcode page.
const STORE_MARKER: u32 = 0xf;

/// Sign-extend a 16-bit field to a full machine word.
pub const fn sign_extend_16(imm: Immediate16) -> Word {
    imm as i16 as i32 as Word
}

/// A packed instruction word with big-endian field layout.
///
/// Field extraction never fails; turning a raw word into a typed
/// [`Instruction`] can, because the reserved page admits malformed
/// encodings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawInstruction(u32);

impl RawInstruction {
    /// Size of an instruction in bytes.
    pub const LEN: usize = 4;

    /// Primary 4-bit opcode field.
    pub const fn op(self) -> u8 {
        ((self.0 >> 28) & 0xf) as u8
    }

    /// Destination register field.
    pub const fn rd(self) -> RegisterId {
        ((self.0 >> 24) & 0xf) as RegisterId
    }

    /// First source register field.
    pub const fn rs(self) -> RegisterId {
        ((self.0 >> 20) & 0xf) as RegisterId
    }

    /// Second source register field.
    pub const fn rt(self) -> RegisterId {
        ((self.0 >> 16) & 0xf) as RegisterId
    }

    /// Immediate field.
    pub const fn imm(self) -> Immediate16 {
        (self.0 & 0xffff) as Immediate16
    }

    /// The packed word.
    pub const fn word(self) -> Word {
        self.0
    }

    /// Resolve the opcode, including the widened STORE tag on the reserved
    /// page.
    pub fn opcode(self) -> Result<Opcode, Fault> {
        match self.op() {
            OP_NOP => match (self.0 >> 24) & 0xf {
                0x0 => Ok(Opcode::NOP),
                STORE_MARKER => Ok(Opcode::STORE),
                _ => Err(Fault::UnknownOpcode),
            },
            op => Opcode::try_from(op),
        }
    }
}

impl From<Word> for RawInstruction {
    fn from(word: Word) -> Self {
        Self(word)
    }
}

impl From<RawInstruction> for Word {
    fn from(raw: RawInstruction) -> Self {
        raw.0
    }
}

/// Pack instruction fields into a word.
///
/// This is the assembler helper: the only producer of the widened STORE
/// tag (`opcode == 0b10000`), which it folds onto the reserved `0b0000`
/// page with the marker in the `rd` field. All field arguments are masked
/// to their widths.
pub const fn make_instruction(
    opcode: u8,
    rd: RegisterId,
    rs: RegisterId,
    rt: RegisterId,
    imm: Immediate16,
) -> RawInstruction {
    let (op, rd) = if opcode == OP_STORE {
        (OP_NOP as u32, STORE_MARKER)
    } else {
        ((opcode & 0xf) as u32, (rd as u32) & 0xf)
    };

    RawInstruction(
        (op << 28) | (rd << 24) | (((rs as u32) & 0xf) << 20) | (((rt as u32) & 0xf) << 16) | imm as u32,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// A decoded instruction with its operands.
pub enum Instruction {
    /// No effect.
    Nop,
    /// Push the advanced PC, jump to `target`.
    Call {
        /// Absolute target address.
        target: Immediate16,
    },
    /// Pop the return address into PC.
    Ret,
    /// Latch the halt bit.
    Halt,
    /// Push `regs[rd]` onto the stack.
    Push {
        /// Register whose value is pushed.
        rd: RegisterId,
    },
    /// Pop the stack top into `regs[rd]`.
    Pop {
        /// Register receiving the popped value.
        rd: RegisterId,
    },
    /// Branch relative to the instruction's own address when Z is set.
    Beq {
        /// Register the branch condition was computed from; consumed for
        /// hazard tracking only.
        rs: RegisterId,
        /// Sign-extended offset from the pre-increment PC.
        offset: Immediate16,
    },
    /// Set flags from `regs[rs] − regs[rt]`.
    Cmp {
        /// Left operand register.
        rs: RegisterId,
        /// Right operand register.
        rt: RegisterId,
    },
    /// `regs[rd] ← regs[rs] + regs[rt]`.
    Add {
        /// Destination register.
        rd: RegisterId,
        /// Left operand register.
        rs: RegisterId,
        /// Right operand register.
        rt: RegisterId,
    },
    /// `regs[rd] ← regs[rs] − regs[rt]`.
    Sub {
        /// Destination register.
        rd: RegisterId,
        /// Left operand register.
        rs: RegisterId,
        /// Right operand register.
        rt: RegisterId,
    },
    /// `regs[rd] ← regs[rs] × regs[rt]`.
    Mul {
        /// Destination register.
        rd: RegisterId,
        /// Left operand register.
        rs: RegisterId,
        /// Right operand register.
        rt: RegisterId,
    },
    /// `regs[rd] ← regs[rs] ÷ regs[rt]`, truncating.
    Div {
        /// Destination register.
        rd: RegisterId,
        /// Dividend register.
        rs: RegisterId,
        /// Divisor register.
        rt: RegisterId,
    },
    /// `regs[rd] ← MEM[regs[rs] + offset]`.
    Load {
        /// Destination register.
        rd: RegisterId,
        /// Base address register.
        rs: RegisterId,
        /// Unsigned byte offset added to the base.
        offset: Immediate16,
    },
    /// `regs[rd] ← sign_extend_16(imm)`.
    Mov {
        /// Destination register.
        rd: RegisterId,
        /// Immediate value, sign-extended at execute time.
        imm: Immediate16,
    },
    /// `regs[rd] ← regs[rs] XOR regs[rt]`.
    Xor {
        /// Destination register.
        rd: RegisterId,
        /// Left operand register.
        rs: RegisterId,
        /// Right operand register.
        rt: RegisterId,
    },
    /// `regs[rd] ← regs[rs] AND regs[rt]`.
    And {
        /// Destination register.
        rd: RegisterId,
        /// Left operand register.
        rs: RegisterId,
        /// Right operand register.
        rt: RegisterId,
    },
    /// `MEM[regs[rs]] ← regs[rt]`.
    Store {
        /// Register holding the target address.
        rs: RegisterId,
        /// Register holding the value to store.
        rt: RegisterId,
    },
}

impl Instruction {
    /// The opcode of this instruction.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Nop => Opcode::NOP,
            Self::Call { .. } => Opcode::CALL,
            Self::Ret => Opcode::RET,
            Self::Halt => Opcode::HALT,
            Self::Push { .. } => Opcode::PUSH,
            Self::Pop { .. } => Opcode::POP,
            Self::Beq { .. } => Opcode::BEQ,
            Self::Cmp { .. } => Opcode::CMP,
            Self::Add { .. } => Opcode::ADD,
            Self::Sub { .. } => Opcode::SUB,
            Self::Mul { .. } => Opcode::MUL,
            Self::Div { .. } => Opcode::DIV,
            Self::Load { .. } => Opcode::LOAD,
            Self::Mov { .. } => Opcode::MOV,
            Self::Xor { .. } => Opcode::XOR,
            Self::And { .. } => Opcode::AND,
            Self::Store { .. } => Opcode::STORE,
        }
    }

    /// Pack into a raw instruction word.
    pub const fn raw(self) -> RawInstruction {
        let op = self.opcode() as u8;

        match self {
            Self::Nop | Self::Ret | Self::Halt => make_instruction(op, 0, 0, 0, 0),
            Self::Call { target } => make_instruction(op, 0, 0, 0, target),
            Self::Push { rd } | Self::Pop { rd } => make_instruction(op, rd, 0, 0, 0),
            Self::Beq { rs, offset } => make_instruction(op, 0, rs, 0, offset),
            Self::Cmp { rs, rt } | Self::Store { rs, rt } => make_instruction(op, 0, rs, rt, 0),
            Self::Add { rd, rs, rt }
            | Self::Sub { rd, rs, rt }
            | Self::Mul { rd, rs, rt }
            | Self::Div { rd, rs, rt }
            | Self::Xor { rd, rs, rt }
            | Self::And { rd, rs, rt } => make_instruction(op, rd, rs, rt, 0),
            Self::Load { rd, rs, offset } => make_instruction(op, rd, rs, 0, offset),
            Self::Mov { rd, imm } => make_instruction(op, rd, 0, 0, imm),
        }
    }
}

impl TryFrom<RawInstruction> for Instruction {
    type Error = Fault;

    fn try_from(raw: RawInstruction) -> Result<Self, Fault> {
        let (rd, rs, rt, imm) = (raw.rd(), raw.rs(), raw.rt(), raw.imm());

        let instruction = match raw.opcode()? {
            Opcode::NOP => Self::Nop,
            Opcode::CALL => Self::Call { target: imm },
            Opcode::RET => Self::Ret,
            Opcode::HALT => Self::Halt,
            Opcode::PUSH => Self::Push { rd },
            Opcode::POP => Self::Pop { rd },
            Opcode::BEQ => Self::Beq { rs, offset: imm },
            Opcode::CMP => Self::Cmp { rs, rt },
            Opcode::ADD => Self::Add { rd, rs, rt },
            Opcode::SUB => Self::Sub { rd, rs, rt },
            Opcode::MUL => Self::Mul { rd, rs, rt },
            Opcode::DIV => Self::Div { rd, rs, rt },
            Opcode::LOAD => Self::Load { rd, rs, offset: imm },
            Opcode::MOV => Self::Mov { rd, imm },
            Opcode::XOR => Self::Xor { rd, rs, rt },
            Opcode::AND => Self::And { rd, rs, rt },
            Opcode::STORE => Self::Store { rs, rt },
        };

        Ok(instruction)
    }
}

impl From<Instruction> for RawInstruction {
    fn from(instruction: Instruction) -> Self {
        instruction.raw()
    }
}

impl FromIterator<Instruction> for Vec<Word> {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        iter.into_iter().map(|instruction| instruction.raw().word()).collect()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Nop => f.write_str("NOP"),
            Self::Call { target } => write!(f, "CALL {target:#06x}"),
            Self::Ret => f.write_str("RET"),
            Self::Halt => f.write_str("HALT"),
            Self::Push { rd } => write!(f, "PUSH R{rd}"),
            Self::Pop { rd } => write!(f, "POP R{rd}"),
            Self::Beq { rs, offset } => write!(f, "BEQ R{rs}, #{}", sign_extend_16(offset) as i32),
            Self::Cmp { rs, rt } => write!(f, "CMP R{rs}, R{rt}"),
            Self::Add { rd, rs, rt } => write!(f, "ADD R{rd}, R{rs}, R{rt}"),
            Self::Sub { rd, rs, rt } => write!(f, "SUB R{rd}, R{rs}, R{rt}"),
            Self::Mul { rd, rs, rt } => write!(f, "MUL R{rd}, R{rs}, R{rt}"),
            Self::Div { rd, rs, rt } => write!(f, "DIV R{rd}, R{rs}, R{rt}"),
            Self::Load { rd, rs, offset } => write!(f, "LOAD R{rd}, [R{rs}+{offset}]"),
            Self::Mov { rd, imm } => {
                let value = sign_extend_16(imm) as i32;
                if value.unsigned_abs() < 10_000 {
                    write!(f, "MOV R{rd}, #{value}")
                } else {
                    write!(f, "MOV R{rd}, #{imm:#06x}")
                }
            }
            Self::Xor { rd, rs, rt } => write!(f, "XOR R{rd}, R{rs}, R{rt}"),
            Self::And { rd, rs, rt } => write!(f, "AND R{rd}, R{rs}, R{rt}"),
            Self::Store { rs, rt } => write!(f, "STORE [R{rs}], R{rt}"),
        }
    }
}

impl fmt::Display for RawInstruction {
    /// Diagnostic rendering; unknown encodings print as
    /// `Unknown OPCODE <bits>` instead of failing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Instruction::try_from(*self) {
            Ok(instruction) => instruction.fmt(f),
            Err(_) => write!(f, "Unknown OPCODE {:04b}", self.op()),
        }
    }
}
