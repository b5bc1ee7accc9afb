use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::cpu::Flag;

/// Operand format of an opcode; selects the bit layout used to pack it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    RegReg,
    RegImmediate,
    RegMemory,
    Branch,
}

/// Condition tested against the comparison flag by conditional jumps and moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cond {
    Ne,
    Eq,
    Le,
    Lt,
    Ge,
    Gt,
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet: u8 {
const EQUAL = 1 << 0;
const LESS = 1 << 1;
const GREATER = 1 << 2;
}
}

impl Cond {
    pub const ALL: [Cond; 6] = [Cond::Ne, Cond::Eq, Cond::Le, Cond::Lt, Cond::Ge, Cond::Gt];

    /// Flag values for which the condition fires.
    pub const fn accepts(self) -> FlagSet {
        match self {
            Cond::Ne => FlagSet::LESS.union(FlagSet::GREATER),
            Cond::Eq => FlagSet::EQUAL,
            Cond::Le => FlagSet::EQUAL.union(FlagSet::LESS),
            Cond::Lt => FlagSet::LESS,
            Cond::Ge => FlagSet::EQUAL.union(FlagSet::GREATER),
            Cond::Gt => FlagSet::GREATER,
        }
    }

    pub fn holds(self, flag: Flag) -> bool {
        self.accepts().contains(flag.as_set())
    }
}

/// Semantic operation bound to an opcode. Both profiles map their
/// mnemonics onto this one set; operand shape differences are resolved
/// by the executor from the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Halt,
    Syscall,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    MulWide,
    DivWide,
    And,
    Or,
    Xor,
    Nand,
    Not,
    Shl,
    Shr,
    Move,
    FAdd,
    FSub,
    FMul,
    FDiv,
    IntToFloat,
    FloatToInt,
    Cmp,
    FCmp,
    Push,
    Pop,
    Call,
    CallDirect,
    Return,
    BranchLink,
    Jump,
    CondJump(Cond),
    CondMove(Cond),
    Load,
    Store,
    LoadPair,
    StorePair,
}

impl Op {
    /// Operations whose second operand lives in the floating-point domain.
    pub fn float_operand(self) -> bool {
        matches!(
            self,
            Op::FAdd | Op::FSub | Op::FMul | Op::FDiv | Op::FCmp | Op::FloatToInt
        )
    }

    pub fn cond(self) -> Option<Cond> {
        match self {
            Op::CondJump(c) | Op::CondMove(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpcodeDesc {
    pub mnemonic: &'static str,
    pub code: u8,
    pub format: Format,
    pub op: Op,
    /// The register field is not written in source and encodes as zero.
    pub implicit_register: bool,
}

impl OpcodeDesc {
    pub const fn new(mnemonic: &'static str, code: u8, format: Format, op: Op) -> Self {
        Self {
            mnemonic,
            code,
            format,
            op,
            implicit_register: false,
        }
    }

    pub const fn implicit(mut self) -> Self {
        self.implicit_register = true;
        self
    }
}
