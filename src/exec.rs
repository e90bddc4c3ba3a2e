//! Shared instruction commit logic.
//!
//! Both the sequential and the pipelined substrates retire instructions
//! through [`Executor`], which borrows the architectural state, the memory
//! backend, and the execution log for the duration of one commit. The
//! program counter has already advanced past the instruction when commit
//! begins; control-flow semantics rely on that.

use crate::state::{CpuState, ExecuteState};
use crate::storage::MemoryBackend;

use slate_asm::{Fault, Instruction, RawInstruction};

mod alu;
mod flow;
mod memory;

pub(crate) struct Executor<'vm, M> {
    state: &'vm mut CpuState,
    memory: &'vm mut M,
    log: &'vm mut Vec<String>,
    step: u64,
}

impl<'vm, M> Executor<'vm, M>
where
    M: MemoryBackend,
{
    pub fn new(
        state: &'vm mut CpuState,
        memory: &'vm mut M,
        log: &'vm mut Vec<String>,
        step: u64,
    ) -> Self {
        Self {
            state,
            memory,
            log,
            step,
        }
    }

    /// Decode and commit one instruction word.
    pub fn execute(mut self, raw: RawInstruction) -> Result<ExecuteState, Fault> {
        match Instruction::try_from(raw)? {
            Instruction::Nop => {
                self.append("NOP".to_string());

                Ok(ExecuteState::Proceed)
            }
            Instruction::Call { target } => self.call(target),
            Instruction::Ret => self.ret(),
            Instruction::Halt => self.halt(),
            Instruction::Push { rd } => self.push(rd),
            Instruction::Pop { rd } => self.pop(rd),
            Instruction::Beq { offset, .. } => self.branch_equal(offset),
            Instruction::Cmp { rs, rt } => self.compare(rs, rt),
            Instruction::Add { rd, rs, rt } => self.add(rd, rs, rt),
            Instruction::Sub { rd, rs, rt } => self.sub(rd, rs, rt),
            Instruction::Mul { rd, rs, rt } => self.mul(rd, rs, rt),
            Instruction::Div { rd, rs, rt } => self.div(rd, rs, rt),
            Instruction::Load { rd, rs, offset } => self.load(rd, rs, offset),
            Instruction::Mov { rd, imm } => self.mov(rd, imm),
            Instruction::Xor { rd, rs, rt } => self.xor(rd, rs, rt),
            Instruction::And { rd, rs, rt } => self.and(rd, rs, rt),
            Instruction::Store { rs, rt } => self.store(rs, rt),
        }
    }

    fn append(&mut self, line: String) {
        self.log.push(format!("[{}] {line}", self.step));
    }
}
