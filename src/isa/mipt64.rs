use super::{Addressing, Field, Isa, Layout, Layouts, Relative, Scaled};
use crate::instructions::{Cond, Format::*, OpcodeDesc as D, Op};

pub const RZ: u8 = 27;
pub const FP: u8 = 28;
pub const SP: u8 = 29;
pub const LR: u8 = 30;
pub const PC: u8 = 31;

const RD: Field = Field::new(21, 5);
const RS: Field = Field::new(16, 5);

const OPCODES: &[D] = &[
    D::new("halt", 0, RegReg, Op::Halt),
    D::new("svc", 1, RegReg, Op::Syscall),
    D::new("add", 2, RegReg, Op::Add),
    D::new("sub", 3, RegReg, Op::Sub),
    D::new("mul", 4, RegReg, Op::Mul),
    D::new("div", 5, RegReg, Op::Div),
    D::new("mod", 6, RegReg, Op::Rem),
    D::new("and", 7, RegReg, Op::And),
    D::new("or", 8, RegReg, Op::Or),
    D::new("xor", 9, RegReg, Op::Xor),
    D::new("nand", 10, RegReg, Op::Nand),
    D::new("shl", 11, RegReg, Op::Shl),
    D::new("shr", 12, RegReg, Op::Shr),
    D::new("addd", 13, RegReg, Op::FAdd),
    D::new("subd", 14, RegReg, Op::FSub),
    D::new("muld", 15, RegReg, Op::FMul),
    D::new("divd", 16, RegReg, Op::FDiv),
    D::new("itod", 17, RegReg, Op::IntToFloat),
    D::new("dtoi", 18, RegReg, Op::FloatToInt),
    D::new("bl", 19, Branch, Op::BranchLink),
    D::new("cmp", 20, RegReg, Op::Cmp),
    D::new("cmpd", 21, RegReg, Op::FCmp),
    D::new("cne", 22, RegReg, Op::CondMove(Cond::Ne)),
    D::new("ceq", 23, RegReg, Op::CondMove(Cond::Eq)),
    D::new("cle", 24, RegReg, Op::CondMove(Cond::Le)),
    D::new("clt", 25, RegReg, Op::CondMove(Cond::Lt)),
    D::new("cge", 26, RegReg, Op::CondMove(Cond::Ge)),
    D::new("cgt", 27, RegReg, Op::CondMove(Cond::Gt)),
    D::new("ld", 28, RegMemory, Op::Load),
    D::new("st", 29, RegMemory, Op::Store),
];

pub static MIPT64: Isa = Isa {
    name: "mipt64",
    word_bits: 64,
    addressing: Addressing::Byte,
    address_space: 1 << 21,
    gpr_count: 32,
    pc: PC,
    sp: SP,
    link: Some(LR),
    zero: Some(RZ),
    register_prefix: 'r',
    aliases: &[("rz", RZ), ("fp", FP), ("sp", SP), ("lr", LR), ("pc", PC)],
    opcode: Field::new(26, 6),
    layouts: Layouts {
        reg_reg: Layout {
            rd: Some(RD),
            rs: Some(RS),
            literal: Field::new(0, 16),
            literal_bases: &[RZ, PC],
            scaled: Some(Scaled {
                index: Field::new(11, 5),
                shift: Field::new(8, 3),
                offset: Field::new(0, 8),
                wide: None,
            }),
            relative: None,
        },
        // No mipt64 opcode uses this format.
        reg_imm: Layout {
            rd: Some(RD),
            rs: None,
            literal: Field::new(0, 21),
            literal_bases: &[],
            scaled: None,
            relative: None,
        },
        reg_mem: Layout {
            rd: Some(RD),
            rs: Some(RS),
            literal: Field::new(0, 16),
            literal_bases: &[RZ, SP, PC],
            scaled: Some(Scaled {
                index: Field::new(11, 5),
                shift: Field::new(8, 3),
                offset: Field::new(0, 8),
                wide: Some(Field::new(0, 11)),
            }),
            relative: None,
        },
        branch: Layout {
            rd: None,
            rs: Some(Field::new(21, 5)),
            literal: Field::new(0, 21),
            literal_bases: &[RZ],
            scaled: Some(Scaled {
                index: Field::new(16, 5),
                shift: Field::new(13, 3),
                offset: Field::new(0, 13),
                wide: None,
            }),
            relative: Some(Relative {
                bases: &[0, PC],
                magnitude: Field::new(0, 20),
                sign_bit: 20,
            }),
        },
    },
    opcodes: OPCODES,
    two_address: false,
    float_words: 1,
    stack_via_base: true,
    shift_mask: Some(6),
    pc_to_pc_absolute: true,
};
