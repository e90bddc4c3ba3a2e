use super::Executor;
use crate::state::ExecuteState;
use crate::storage::MemoryBackend;

use slate_asm::{sign_extend_16, Fault, Immediate16, RegisterId, Word};

impl<M> Executor<'_, M>
where
    M: MemoryBackend,
{
    pub(super) fn add(
        &mut self,
        rd: RegisterId,
        rs: RegisterId,
        rt: RegisterId,
    ) -> Result<ExecuteState, Fault> {
        let (a, b) = (self.state.reg(rs)?, self.state.reg(rt)?);
        let (result, carry) = a.overflowing_add(b);

        self.state.flags.carry = carry;
        self.alu_commit("ADD", rd, rs, rt, a, b, result)
    }

    pub(super) fn sub(
        &mut self,
        rd: RegisterId,
        rs: RegisterId,
        rt: RegisterId,
    ) -> Result<ExecuteState, Fault> {
        let (a, b) = (self.state.reg(rs)?, self.state.reg(rt)?);
        let result = a.wrapping_sub(b);

        // borrow, not two's-complement overflow
        self.state.flags.carry = b > a;
        self.alu_commit("SUB", rd, rs, rt, a, b, result)
    }

    pub(super) fn mul(
        &mut self,
        rd: RegisterId,
        rs: RegisterId,
        rt: RegisterId,
    ) -> Result<ExecuteState, Fault> {
        let (a, b) = (self.state.reg(rs)?, self.state.reg(rt)?);
        let full = u64::from(a) * u64::from(b);

        self.state.flags.carry = full > u64::from(Word::MAX);
        self.alu_commit("MUL", rd, rs, rt, a, b, full as Word)
    }

    pub(super) fn div(
        &mut self,
        rd: RegisterId,
        rs: RegisterId,
        rt: RegisterId,
    ) -> Result<ExecuteState, Fault> {
        let (a, b) = (self.state.reg(rs)?, self.state.reg(rt)?);

        if b == 0 {
            return Err(Fault::DivisionByZero);
        }

        // truncating; C is left alone
        self.alu_commit("DIV", rd, rs, rt, a, b, a / b)
    }

    pub(super) fn xor(
        &mut self,
        rd: RegisterId,
        rs: RegisterId,
        rt: RegisterId,
    ) -> Result<ExecuteState, Fault> {
        let (a, b) = (self.state.reg(rs)?, self.state.reg(rt)?);

        self.alu_commit("XOR", rd, rs, rt, a, b, a ^ b)
    }

    pub(super) fn and(
        &mut self,
        rd: RegisterId,
        rs: RegisterId,
        rt: RegisterId,
    ) -> Result<ExecuteState, Fault> {
        let (a, b) = (self.state.reg(rs)?, self.state.reg(rt)?);

        self.alu_commit("AND", rd, rs, rt, a, b, a & b)
    }

    pub(super) fn compare(&mut self, rs: RegisterId, rt: RegisterId) -> Result<ExecuteState, Fault> {
        let (a, b) = (self.state.reg(rs)?, self.state.reg(rt)?);

        self.state.flags.set_zn(a.wrapping_sub(b));
        self.state.flags.carry = b > a;
        self.append(format!("CMP R{rs}({a:#010x}) with R{rt}({b:#010x})"));

        Ok(ExecuteState::Proceed)
    }

    pub(super) fn mov(&mut self, rd: RegisterId, imm: Immediate16) -> Result<ExecuteState, Fault> {
        let value = sign_extend_16(imm);

        self.state.set_reg(rd, value)?;
        self.append(format!("MOV R{rd} = {}", value as i32));

        Ok(ExecuteState::Proceed)
    }

    /// Write the reduced result, update Z and N, and log the commit. C has
    /// already been set (or deliberately left alone) by the caller.
    fn alu_commit(
        &mut self,
        mnemonic: &str,
        rd: RegisterId,
        rs: RegisterId,
        rt: RegisterId,
        a: Word,
        b: Word,
        result: Word,
    ) -> Result<ExecuteState, Fault> {
        self.state.set_reg(rd, result)?;
        self.state.flags.set_zn(result);
        self.append(format!(
            "{mnemonic} R{rd} = R{rs}({a:#010x}) {mnemonic} R{rt}({b:#010x}) = {result:#010x}"
        ));

        Ok(ExecuteState::Proceed)
    }
}
