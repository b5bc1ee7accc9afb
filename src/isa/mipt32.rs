use super::{Addressing, Field, Isa, Layout, Layouts};
use crate::instructions::{Cond, Format::*, OpcodeDesc as D, Op};

const RD: Field = Field::new(20, 4);
const RS: Field = Field::new(16, 4);

const OPCODES: &[D] = &[
    D::new("halt", 0, RegImmediate, Op::Halt).implicit(),
    D::new("syscall", 1, RegImmediate, Op::Syscall),
    D::new("add", 2, RegReg, Op::Add),
    D::new("addi", 3, RegImmediate, Op::Add),
    D::new("sub", 4, RegReg, Op::Sub),
    D::new("subi", 5, RegImmediate, Op::Sub),
    D::new("mul", 6, RegReg, Op::MulWide),
    D::new("muli", 7, RegImmediate, Op::MulWide),
    D::new("div", 8, RegReg, Op::DivWide),
    D::new("divi", 9, RegImmediate, Op::DivWide),
    D::new("lc", 12, RegImmediate, Op::Move),
    D::new("shl", 13, RegReg, Op::Shl),
    D::new("shli", 14, RegImmediate, Op::Shl),
    D::new("shr", 15, RegReg, Op::Shr),
    D::new("shri", 16, RegImmediate, Op::Shr),
    D::new("and", 17, RegReg, Op::And),
    D::new("andi", 18, RegImmediate, Op::And),
    D::new("or", 19, RegReg, Op::Or),
    D::new("ori", 20, RegImmediate, Op::Or),
    D::new("xor", 21, RegReg, Op::Xor),
    D::new("xori", 22, RegImmediate, Op::Xor),
    D::new("not", 23, RegImmediate, Op::Not),
    D::new("mov", 24, RegReg, Op::Move),
    D::new("addd", 32, RegReg, Op::FAdd),
    D::new("subd", 33, RegReg, Op::FSub),
    D::new("muld", 34, RegReg, Op::FMul),
    D::new("divd", 35, RegReg, Op::FDiv),
    D::new("itod", 36, RegReg, Op::IntToFloat),
    D::new("dtoi", 37, RegReg, Op::FloatToInt),
    D::new("push", 38, RegImmediate, Op::Push),
    D::new("pop", 39, RegImmediate, Op::Pop),
    D::new("call", 40, RegReg, Op::Call),
    D::new("calli", 41, Branch, Op::CallDirect),
    D::new("ret", 42, RegImmediate, Op::Return).implicit(),
    D::new("cmp", 43, RegReg, Op::Cmp),
    D::new("cmpi", 44, RegImmediate, Op::Cmp),
    D::new("cmpd", 45, RegReg, Op::FCmp),
    D::new("jmp", 46, Branch, Op::Jump),
    D::new("jne", 47, Branch, Op::CondJump(Cond::Ne)),
    D::new("jeq", 48, Branch, Op::CondJump(Cond::Eq)),
    D::new("jle", 49, Branch, Op::CondJump(Cond::Le)),
    D::new("jl", 50, Branch, Op::CondJump(Cond::Lt)),
    D::new("jge", 51, Branch, Op::CondJump(Cond::Ge)),
    D::new("jg", 52, Branch, Op::CondJump(Cond::Gt)),
    D::new("load", 64, RegMemory, Op::Load),
    D::new("store", 65, RegMemory, Op::Store),
    D::new("load2", 66, RegMemory, Op::LoadPair),
    D::new("store2", 67, RegMemory, Op::StorePair),
    D::new("loadr", 68, RegReg, Op::Load),
    D::new("loadr2", 69, RegReg, Op::LoadPair),
    D::new("storer", 70, RegReg, Op::Store),
    D::new("storer2", 71, RegReg, Op::StorePair),
];

pub static MIPT32: Isa = Isa {
    name: "mipt32",
    word_bits: 32,
    addressing: Addressing::Word,
    address_space: 1 << 20,
    gpr_count: 16,
    pc: 15,
    sp: 14,
    link: None,
    zero: None,
    register_prefix: 'r',
    aliases: &[("sp", 14), ("pc", 15)],
    opcode: Field::new(24, 8),
    layouts: Layouts {
        reg_imm: Layout {
            rd: Some(RD),
            rs: None,
            literal: Field::new(0, 20),
            literal_bases: &[],
            scaled: None,
            relative: None,
        },
        reg_reg: Layout {
            rd: Some(RD),
            rs: Some(RS),
            literal: Field::new(0, 16),
            literal_bases: &[],
            scaled: None,
            relative: None,
        },
        reg_mem: Layout {
            rd: Some(RD),
            rs: None,
            literal: Field::new(0, 20),
            literal_bases: &[],
            scaled: None,
            relative: None,
        },
        branch: Layout {
            rd: None,
            rs: None,
            literal: Field::new(0, 24),
            literal_bases: &[],
            scaled: None,
            relative: None,
        },
    },
    opcodes: OPCODES,
    two_address: true,
    float_words: 2,
    stack_via_base: false,
    shift_mask: None,
    pc_to_pc_absolute: false,
};
