use super::Executor;
use crate::state::ExecuteState;
use crate::storage::MemoryBackend;

use slate_asm::{Fault, Immediate16, RegisterId, Word};

impl<M> Executor<'_, M>
where
    M: MemoryBackend,
{
    pub(super) fn load(
        &mut self,
        rd: RegisterId,
        rs: RegisterId,
        offset: Immediate16,
    ) -> Result<ExecuteState, Fault> {
        let addr = self.state.reg(rs)?.wrapping_add(Word::from(offset));
        let value = self.memory.read_word(addr);

        self.state.set_reg(rd, value)?;
        self.append(format!("LOAD R{rd} = MEM[R{rs} + {offset}] = {value}"));

        Ok(ExecuteState::Proceed)
    }

    pub(super) fn store(&mut self, rs: RegisterId, rt: RegisterId) -> Result<ExecuteState, Fault> {
        let addr = self.state.reg(rs)?;
        let value = self.state.reg(rt)?;

        // An unwritable address is reported in the log, not raised: the
        // controller's write contract returns failure without mutating.
        if self.memory.write_word(addr, value) {
            self.append(format!("STORE MEM[R{rs}({addr:#010x})] = R{rt}({value:#010x})"));
        } else {
            self.append(format!("STORE to {addr:#010x} out of range"));
        }

        Ok(ExecuteState::Proceed)
    }
}
