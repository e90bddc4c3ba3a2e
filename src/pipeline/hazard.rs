//! Data-hazard detection over raw slot contents.
//!
//! Hazards are detected only between the decode and execute slots: with
//! three stages the producer's shadow is one instruction deep, so longer
//! lookback cannot occur.

use slate_asm::opcode::consts::*;
use slate_asm::{RawInstruction, RegisterId};

/// Whether the instruction in D reads a register the instruction in E is
/// about to write.
///
/// Consumers are the register-reading ALU ops (rs and rt), BEQ (rs only),
/// and LOAD (rs only).
pub(crate) fn has_data_hazard(decode: RawInstruction, execute: RawInstruction) -> bool {
    let Some(target) = write_target(execute) else {
        return false;
    };

    match decode.op() {
        OP_ADD | OP_SUB | OP_MUL => decode.rs() == target || decode.rt() == target,
        OP_BEQ | OP_LOAD => decode.rs() == target,
        _ => false,
    }
}

/// The register written by a hazard-relevant producer, if any.
fn write_target(raw: RawInstruction) -> Option<RegisterId> {
    match raw.op() {
        OP_ADD | OP_SUB | OP_MUL | OP_MOV | OP_LOAD | OP_AND | OP_XOR => Some(raw.rd()),
        _ => None,
    }
}

/// The destination register of any register-writing instruction; feeds
/// the modified-register telemetry, which also records DIV.
pub(crate) fn destination(raw: RawInstruction) -> Option<RegisterId> {
    match raw.op() {
        OP_ADD | OP_SUB | OP_MUL | OP_DIV | OP_LOAD | OP_MOV | OP_XOR | OP_AND => Some(raw.rd()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use slate_asm::Instruction;

    fn raw(instruction: Instruction) -> RawInstruction {
        instruction.raw()
    }

    #[test]
    fn consumer_reading_producer_target_stalls() {
        let producer = raw(Instruction::Add { rd: 2, rs: 1, rt: 1 });
        let consumer = raw(Instruction::Add { rd: 3, rs: 2, rt: 1 });

        assert!(has_data_hazard(consumer, producer));
    }

    #[test]
    fn consumer_rt_match_stalls() {
        let producer = raw(Instruction::Mov { rd: 5, imm: 1 });
        let consumer = raw(Instruction::Sub { rd: 0, rs: 1, rt: 5 });

        assert!(has_data_hazard(consumer, producer));
    }

    #[test]
    fn beq_consumes_rs_only() {
        let producer = raw(Instruction::Mov { rd: 1, imm: 1 });

        assert!(has_data_hazard(raw(Instruction::Beq { rs: 1, offset: 8 }), producer));
        assert!(!has_data_hazard(raw(Instruction::Beq { rs: 2, offset: 8 }), producer));
    }

    #[test]
    fn load_consumes_its_base_register() {
        let producer = raw(Instruction::Mov { rd: 3, imm: 0x100 });
        let consumer = raw(Instruction::Load { rd: 4, rs: 3, offset: 0 });

        assert!(has_data_hazard(consumer, producer));
    }

    #[test]
    fn non_producers_never_stall_consumers() {
        let consumer = raw(Instruction::Add { rd: 3, rs: 0, rt: 1 });

        for not_a_producer in [
            raw(Instruction::Cmp { rs: 0, rt: 1 }),
            raw(Instruction::Push { rd: 0 }),
            raw(Instruction::Store { rs: 0, rt: 1 }),
            raw(Instruction::Nop),
        ] {
            assert!(!has_data_hazard(consumer, not_a_producer));
        }
    }

    #[test]
    fn independent_registers_do_not_stall() {
        let producer = raw(Instruction::Add { rd: 2, rs: 1, rt: 1 });
        let consumer = raw(Instruction::Add { rd: 4, rs: 3, rt: 3 });

        assert!(!has_data_hazard(consumer, producer));
    }

    #[test]
    fn destinations_cover_div_but_hazards_do_not() {
        let div = raw(Instruction::Div { rd: 6, rs: 1, rt: 2 });
        let consumer = raw(Instruction::Add { rd: 0, rs: 6, rt: 6 });

        assert_eq!(destination(div), Some(6));
        assert!(!has_data_hazard(consumer, div));
    }
}
