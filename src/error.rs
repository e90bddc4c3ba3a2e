//! Runtime interpreter error implementation.

use slate_asm::{Fault, RawInstruction, Word};

use thiserror::Error;

/// Interpreter runtime error variants.
///
/// Every fault is surfaced to the driver: the sequential interpreter logs
/// and returns it, the pipelined interpreter raises it from its E-stage
/// commit, and a core treats the failing thread as halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InterpreterError {
    /// An instruction commit faulted; carries the faulting word.
    #[error("execution fault at pc {pc:#010x}: {fault} ({instruction})")]
    FaultInstruction {
        /// The fault kind.
        fault: Fault,
        /// Program counter at the time of the fault.
        pc: Word,
        /// The instruction whose commit faulted.
        instruction: RawInstruction,
    },
    /// A fault raised outside an instruction commit, e.g. at fetch.
    #[error("fault at pc {pc:#010x}: {fault}")]
    Fault {
        /// The fault kind.
        fault: Fault,
        /// Program counter at the time of the fault.
        pc: Word,
    },
}

impl InterpreterError {
    /// The fault kind that caused this error.
    pub const fn fault(&self) -> Fault {
        match self {
            Self::FaultInstruction { fault, .. } | Self::Fault { fault, .. } => *fault,
        }
    }

    /// The instruction that caused this error, if the fault was raised
    /// from a commit.
    pub const fn instruction(&self) -> Option<RawInstruction> {
        match self {
            Self::FaultInstruction { instruction, .. } => Some(*instruction),
            Self::Fault { .. } => None,
        }
    }
}
