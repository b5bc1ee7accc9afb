use std::fmt;
use std::ops::Range;

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::encoder::EncodeError;
use crate::instructions::{Format, OpcodeDesc};

pub mod mipt32;
pub mod mipt64;

pub use mipt32::MIPT32;
pub use mipt64::MIPT64;

/// Bit range `lo..lo + width` inside an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub lo: u8,
    pub width: u8,
}

impl Field {
    pub const fn new(lo: u8, width: u8) -> Self {
        Self { lo, width }
    }

    pub const fn max(self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    pub fn range(self) -> Range<usize> {
        self.lo as usize..self.lo as usize + self.width as usize
    }

    pub fn overlaps(self, other: Field) -> bool {
        let (a, b) = (self.range(), other.range());
        a.start < b.end && b.start < a.end
    }

    pub fn extract(self, raw: u64) -> u64 {
        raw.view_bits::<Lsb0>()[self.range()].load_le::<u64>()
    }

    pub fn insert(self, raw: &mut u64, value: u64, name: &'static str) -> Result<(), EncodeError> {
        if value > self.max() {
            return Err(EncodeError::Overflow {
                field: name,
                value,
                width: self.width,
            });
        }
        raw.view_bits_mut::<Lsb0>()[self.range()].store_le(value);
        Ok(())
    }
}

/// Register-scaled operand: `(reg[index] << shift) + offset`.
#[derive(Debug, Clone, Copy)]
pub struct Scaled {
    pub index: Field,
    pub shift: Field,
    pub offset: Field,
    /// Literal that replaces shift and offset when the index is the zero register.
    pub wide: Option<Field>,
}

/// Sign-magnitude displacement, used when the base register is in `bases`.
#[derive(Debug, Clone, Copy)]
pub struct Relative {
    pub bases: &'static [u8],
    pub magnitude: Field,
    pub sign_bit: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub rd: Option<Field>,
    /// Source register for register-register forms, base register otherwise.
    pub rs: Option<Field>,
    pub literal: Field,
    /// Base registers that select the plain literal form.
    pub literal_bases: &'static [u8],
    pub scaled: Option<Scaled>,
    pub relative: Option<Relative>,
}

impl Layout {
    pub fn is_relative_base(&self, base: u8) -> bool {
        self.relative.map_or(false, |r| r.bases.contains(&base))
    }

    /// Whether an instruction with this base register uses the scaled form.
    pub fn scaled_for(&self, base: u8) -> Option<Scaled> {
        if self.is_relative_base(base) || self.literal_bases.contains(&base) {
            return None;
        }
        self.scaled
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Layouts {
    pub reg_reg: Layout,
    pub reg_imm: Layout,
    pub reg_mem: Layout,
    pub branch: Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Addressing {
    /// Each address names one machine word.
    Word,
    /// Each address names one byte; words are little-endian.
    Byte,
}

#[derive(Debug)]
pub struct Isa {
    pub name: &'static str,
    pub word_bits: u32,
    pub addressing: Addressing,
    /// Size of memory in address units.
    pub address_space: u64,
    pub gpr_count: u8,
    pub pc: u8,
    pub sp: u8,
    pub link: Option<u8>,
    pub zero: Option<u8>,
    pub register_prefix: char,
    pub aliases: &'static [(&'static str, u8)],
    pub opcode: Field,
    pub layouts: Layouts,
    pub opcodes: &'static [OpcodeDesc],
    /// Destination doubles as the first source (`add r1, r2` means `r1 += r2`).
    pub two_address: bool,
    /// Words needed to hold one IEEE-754 double.
    pub float_words: u8,
    /// Memory access through the stack pointer as base pushes and pops.
    pub stack_via_base: bool,
    /// Shift amounts are masked to this many low bits before shifting.
    pub shift_mask: Option<u32>,
    /// `add pc, pc, v` (and the conditional moves) load `v` itself into pc.
    pub pc_to_pc_absolute: bool,
}

impl Isa {
    pub fn word_bytes(&self) -> u64 {
        u64::from(self.word_bits / 8)
    }

    /// Address units occupied by one word (and by one instruction).
    pub fn unit(&self) -> u64 {
        match self.addressing {
            Addressing::Word => 1,
            Addressing::Byte => self.word_bytes(),
        }
    }

    pub fn mask(&self, v: u64) -> u64 {
        if self.word_bits >= 64 {
            v
        } else {
            v & ((1u64 << self.word_bits) - 1)
        }
    }

    /// Two's-complement interpretation of a word.
    pub fn signed(&self, v: u64) -> i64 {
        let s = 64 - self.word_bits;
        ((v << s) as i64) >> s
    }

    pub fn layout(&self, format: Format) -> &Layout {
        match format {
            Format::RegReg => &self.layouts.reg_reg,
            Format::RegImmediate => &self.layouts.reg_imm,
            Format::RegMemory => &self.layouts.reg_mem,
            Format::Branch => &self.layouts.branch,
        }
    }

    pub fn by_mnemonic(&self, mnemonic: &str) -> Option<&'static OpcodeDesc> {
        self.opcodes.iter().find(|d| d.mnemonic == mnemonic)
    }

    pub fn by_code(&self, code: u8) -> Option<&'static OpcodeDesc> {
        self.opcodes.iter().find(|d| d.code == code)
    }

    /// Resolve a register operand: an alias or the prefix followed by digits.
    pub fn register(&self, token: &str) -> Option<u8> {
        if let Some(&(_, idx)) = self.aliases.iter().find(|(name, _)| *name == token) {
            return Some(idx);
        }
        let digits = token.strip_prefix(self.register_prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn register_name(&self, idx: u8) -> String {
        match self.aliases.iter().find(|(_, i)| *i == idx) {
            Some((name, _)) => (*name).to_string(),
            None => format!("{}{}", self.register_prefix, idx),
        }
    }

    /// Stack pointer value at reset: one past the last addressable unit.
    pub fn initial_sp(&self) -> u64 {
        self.address_space
    }
}

/// Selects one of the built-in machine descriptors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Mipt32,
    Mipt64,
}

impl Profile {
    pub fn isa(self) -> &'static Isa {
        match self {
            Profile::Mipt32 => &MIPT32,
            Profile::Mipt64 => &MIPT64,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.isa().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_insert_then_extract() {
        let f = Field::new(20, 4);
        let mut raw = 0xFF00_0000u64;
        f.insert(&mut raw, 0xA, "rd").unwrap();
        assert_eq!(raw, 0xFFA0_0000);
        assert_eq!(f.extract(raw), 0xA);
        assert!(f.insert(&mut raw, 0x10, "rd").is_err());
    }

    #[test]
    fn signed_view_follows_word_width() {
        assert_eq!(MIPT32.signed(0xFFFF_FFFF), -1);
        assert_eq!(MIPT32.signed(0x7FFF_FFFF), i32::MAX as i64);
        assert_eq!(MIPT64.signed(u64::MAX), -1);
        assert_eq!(MIPT32.mask(u64::MAX), 0xFFFF_FFFF);
    }

    #[test]
    fn register_tokens() {
        assert_eq!(MIPT64.register("rz"), Some(27));
        assert_eq!(MIPT64.register("r12"), Some(12));
        assert_eq!(MIPT64.register("r"), None);
        assert_eq!(MIPT64.register("result"), None);
        assert_eq!(MIPT32.register("sp"), Some(14));
        assert_eq!(MIPT64.register_name(29), "sp");
        assert_eq!(MIPT32.register_name(3), "r3");
    }
}
