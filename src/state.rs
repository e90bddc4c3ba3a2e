//! Architectural state shared by every substrate.

use crate::consts::REGISTER_COUNT;

use slate_asm::{Fault, RegisterId, Word};

use itertools::Itertools;

mod debugger;

pub use debugger::Debugger;

/// Condition flags set by ALU operations and CMP.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flags {
    /// Last committed result was zero.
    pub zero: bool,
    /// Bit 31 of the last committed result.
    pub negative: bool,
    /// Carry out of ADD/MUL, or the borrow flag of SUB/CMP.
    pub carry: bool,
}

impl Flags {
    /// Update Z and N from a reduced 32-bit result, leaving C alone.
    pub(crate) fn set_zn(&mut self, result: Word) {
        self.zero = result == 0;
        self.negative = (result >> 31) & 1 == 1;
    }
}

/// Per-thread architectural state: register bank, program counter,
/// software stack, condition flags, and the halt latch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CpuState {
    pub(crate) registers: [Word; REGISTER_COUNT],
    pub(crate) pc: Word,
    pub(crate) stack: Vec<Word>,
    pub(crate) flags: Flags,
    pub(crate) halted: bool,
}

impl CpuState {
    /// The register bank.
    pub const fn registers(&self) -> &[Word; REGISTER_COUNT] {
        &self.registers
    }

    /// The program counter.
    pub const fn pc(&self) -> Word {
        self.pc
    }

    /// Snapshot of the software stack, bottom first.
    pub fn stack(&self) -> &[Word] {
        self.stack.as_slice()
    }

    /// The condition flags.
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Whether HALT has retired.
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Read one register, faulting on an index outside the bank.
    ///
    /// Indices are masked to four bits at decode time, so with a 16-entry
    /// bank the fault is unreachable from well-formed words; the check is
    /// kept because the bank size is a parameter of the architecture, not
    /// of the encoding.
    pub fn reg(&self, index: RegisterId) -> Result<Word, Fault> {
        self.registers
            .get(index)
            .copied()
            .ok_or(Fault::InvalidRegister)
    }

    /// Write one register, faulting on an index outside the bank.
    pub fn set_reg(&mut self, index: RegisterId, value: Word) -> Result<(), Fault> {
        *self.registers.get_mut(index).ok_or(Fault::InvalidRegister)? = value;

        Ok(())
    }

    /// Render the register bank in rows of four, as the state inspectors
    /// print it.
    pub fn dump_registers(&self) -> String {
        self.registers
            .chunks(4)
            .enumerate()
            .map(|(row, values)| {
                values
                    .iter()
                    .enumerate()
                    .map(|(col, value)| format!("R{}: {value:#010x}", row * 4 + col))
                    .join("  ")
            })
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Resulting state of a single instruction commit.
pub enum ExecuteState {
    /// Execution should proceed with the next instruction.
    Proceed,
    /// The instruction redirected the program counter (CALL, RET, or a
    /// taken BEQ). In the pipelined substrate this is the control-hazard
    /// flush signal.
    Jumped,
    /// HALT retired; the interpreter refuses further steps.
    Halted,
}

impl ExecuteState {
    /// Whether the committed instruction redirected the program counter.
    pub const fn is_jump(&self) -> bool {
        matches!(self, Self::Jumped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Resulting state of a program run.
pub enum ProgramState {
    /// HALT retired and, for a pipeline, the slots drained.
    Halted,
    /// The pipeline drained without a retired HALT: fetch ran past the
    /// loaded program.
    Drained,
    /// The step or cycle budget was exhausted first.
    StepLimit,
    /// Execution is suspended at a breakpoint; resuming will not
    /// immediately re-trigger it.
    Breakpoint(Word),
}
