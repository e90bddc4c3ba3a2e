use super::Executor;
use crate::state::ExecuteState;
use crate::storage::MemoryBackend;

use slate_asm::{sign_extend_16, Fault, Immediate16, RawInstruction, RegisterId, Word};

impl<M> Executor<'_, M>
where
    M: MemoryBackend,
{
    pub(super) fn call(&mut self, target: Immediate16) -> Result<ExecuteState, Fault> {
        // PC has already advanced past the CALL; that is the return address.
        let return_addr = self.state.pc;
        self.state.stack.push(return_addr);
        self.state.pc = Word::from(target);
        self.append(format!("CALL {target:#06x} (return to {return_addr:#010x})"));

        Ok(ExecuteState::Jumped)
    }

    pub(super) fn ret(&mut self) -> Result<ExecuteState, Fault> {
        match self.state.stack.pop() {
            Some(return_addr) => {
                self.state.pc = return_addr;
                self.append(format!("RET to {return_addr:#010x}"));

                Ok(ExecuteState::Jumped)
            }
            None => {
                self.append("RET ERROR: stack underflow".to_string());

                Err(Fault::StackUnderflow)
            }
        }
    }

    pub(super) fn halt(&mut self) -> Result<ExecuteState, Fault> {
        self.state.halted = true;
        self.append("HALT".to_string());

        Ok(ExecuteState::Halted)
    }

    pub(super) fn push(&mut self, rd: RegisterId) -> Result<ExecuteState, Fault> {
        let value = self.state.reg(rd)?;

        self.state.stack.push(value);
        self.append(format!("PUSH R{rd} ({value:#010x})"));

        Ok(ExecuteState::Proceed)
    }

    pub(super) fn pop(&mut self, rd: RegisterId) -> Result<ExecuteState, Fault> {
        match self.state.stack.pop() {
            Some(value) => {
                self.state.set_reg(rd, value)?;
                self.append(format!("POP R{rd} ({value:#010x})"));

                Ok(ExecuteState::Proceed)
            }
            None => {
                self.append("POP ERROR: stack underflow".to_string());

                Err(Fault::StackUnderflow)
            }
        }
    }

    pub(super) fn branch_equal(&mut self, offset: Immediate16) -> Result<ExecuteState, Fault> {
        if self.state.flags.zero {
            // Target is relative to the branch's own address: PC advanced
            // by one instruction at fetch.
            self.state.pc = self
                .state
                .pc
                .wrapping_sub(RawInstruction::LEN as Word)
                .wrapping_add(sign_extend_16(offset));
            self.append(format!("BEQ branch taken to PC={:#010x}", self.state.pc));

            Ok(ExecuteState::Jumped)
        } else {
            self.append("BEQ no branch".to_string());

            Ok(ExecuteState::Proceed)
        }
    }
}
