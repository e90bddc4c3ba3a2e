use crate::opcode::consts::*;
use crate::*;

use rstest::rstest;
use strum::IntoEnumIterator;

#[rstest]
#[case(OP_CALL, 0, 0, 0, 0x0100)]
#[case(OP_PUSH, 1, 0, 0, 0)]
#[case(OP_POP, 14, 0, 0, 0)]
#[case(OP_BEQ, 0, 1, 0, 0x0010)]
#[case(OP_CMP, 0, 1, 15, 0)]
#[case(OP_ADD, 0, 1, 2, 0)]
#[case(OP_SUB, 4, 1, 5, 0)]
#[case(OP_MUL, 2, 2, 1, 0)]
#[case(OP_DIV, 3, 9, 10, 0)]
#[case(OP_LOAD, 4, 3, 0, 0x0204)]
#[case(OP_MOV, 7, 0, 0, 0xfffe)]
#[case(OP_XOR, 5, 5, 5, 0)]
#[case(OP_AND, 15, 14, 13, 0)]
fn field_round_trip(
    #[case] op: u8,
    #[case] rd: RegisterId,
    #[case] rs: RegisterId,
    #[case] rt: RegisterId,
    #[case] imm: Immediate16,
) {
    let raw = make_instruction(op, rd, rs, rt, imm);

    assert_eq!(raw.op(), op);
    assert_eq!(raw.rd(), rd);
    assert_eq!(raw.rs(), rs);
    assert_eq!(raw.rt(), rt);
    assert_eq!(raw.imm(), imm);
}

#[test]
fn packed_layout_is_big_endian() {
    let raw = make_instruction(OP_ADD, 0x1, 0x2, 0x3, 0xbeef);

    assert_eq!(raw.word(), 0x8123_beef);
}

#[test]
fn store_uses_the_reserved_page() {
    let raw = make_instruction(OP_STORE, 0, 3, 6, 0);

    // The widened tag cannot occupy the 4-bit opcode field; the helper
    // folds it onto the NOP page with the marker in rd.
    assert_eq!(raw.op(), 0b0000);
    assert_eq!(raw.opcode(), Ok(Opcode::STORE));
    assert_eq!(
        Instruction::try_from(raw),
        Ok(Instruction::Store { rs: 3, rt: 6 })
    );
}

#[test]
fn zero_word_is_nop() {
    let raw = RawInstruction::from(0u32);

    assert_eq!(raw.opcode(), Ok(Opcode::NOP));
    assert_eq!(Instruction::try_from(raw), Ok(Instruction::Nop));
}

#[test]
fn malformed_reserved_page_is_unknown() {
    // Opcode nibble 0 with an rd that is neither the NOP zero nor the
    // STORE marker has no assigned meaning.
    let raw = make_instruction(OP_NOP, 5, 0, 0, 0);

    assert_eq!(raw.opcode(), Err(Fault::UnknownOpcode));
    assert_eq!(Instruction::try_from(raw), Err(Fault::UnknownOpcode));
    assert_eq!(raw.to_string(), "Unknown OPCODE 0000");
}

#[test]
fn typed_round_trip() {
    let samples = [
        Instruction::Nop,
        Instruction::Call { target: 0x0100 },
        Instruction::Ret,
        Instruction::Halt,
        Instruction::Push { rd: 1 },
        Instruction::Pop { rd: 1 },
        Instruction::Beq { rs: 1, offset: 0x0010 },
        Instruction::Cmp { rs: 1, rt: 15 },
        Instruction::Add { rd: 0, rs: 1, rt: 2 },
        Instruction::Sub { rd: 1, rs: 1, rt: 15 },
        Instruction::Mul { rd: 2, rs: 2, rt: 1 },
        Instruction::Div { rd: 3, rs: 9, rt: 10 },
        Instruction::Load { rd: 4, rs: 3, offset: 0x0204 },
        Instruction::Mov { rd: 7, imm: 0xfffe },
        Instruction::Xor { rd: 5, rs: 5, rt: 5 },
        Instruction::And { rd: 15, rs: 14, rt: 13 },
        Instruction::Store { rs: 3, rt: 6 },
    ];

    for instruction in samples {
        assert_eq!(Instruction::try_from(instruction.raw()), Ok(instruction));
    }
}

#[test]
fn every_opcode_decodes_back_to_itself() {
    for opcode in Opcode::iter() {
        assert_eq!(Opcode::try_from(opcode as u8), Ok(opcode));
        assert!(!opcode.mnemonic().is_empty());
    }
}

#[rstest]
#[case(0x0000, 0)]
#[case(0x0001, 1)]
#[case(0x7fff, 0x0000_7fff)]
#[case(0x8000, 0xffff_8000)]
#[case(0xffff, 0xffff_ffff)]
#[case(0xfffc, 0xffff_fffc)]
fn sign_extension(#[case] imm: Immediate16, #[case] expected: Word) {
    assert_eq!(sign_extend_16(imm), expected);
}

#[rstest]
#[case(Instruction::Nop, "NOP")]
#[case(Instruction::Call { target: 0x100 }, "CALL 0x0100")]
#[case(Instruction::Ret, "RET")]
#[case(Instruction::Halt, "HALT")]
#[case(Instruction::Push { rd: 1 }, "PUSH R1")]
#[case(Instruction::Pop { rd: 14 }, "POP R14")]
#[case(Instruction::Beq { rs: 1, offset: 0xfffc }, "BEQ R1, #-4")]
#[case(Instruction::Cmp { rs: 1, rt: 15 }, "CMP R1, R15")]
#[case(Instruction::Add { rd: 0, rs: 1, rt: 2 }, "ADD R0, R1, R2")]
#[case(Instruction::Load { rd: 4, rs: 3, offset: 8 }, "LOAD R4, [R3+8]")]
#[case(Instruction::Mov { rd: 7, imm: 42 }, "MOV R7, #42")]
#[case(Instruction::Mov { rd: 7, imm: 0x7000 }, "MOV R7, #0x7000")]
#[case(Instruction::Store { rs: 3, rt: 6 }, "STORE [R3], R6")]
fn pretty_printing(#[case] instruction: Instruction, #[case] rendered: &str) {
    assert_eq!(instruction.to_string(), rendered);
    assert_eq!(instruction.raw().to_string(), rendered);
}

#[test]
fn collecting_instructions_assembles_words() {
    let program: Vec<Word> = vec![
        Instruction::Mov { rd: 1, imm: 3 },
        Instruction::Halt,
    ]
    .into_iter()
    .collect();

    assert_eq!(program, vec![0xd100_0003, 0x3000_0000]);
}
