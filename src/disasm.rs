use crate::decoder::{Decoded, Operand};
use crate::instructions::Format;
use crate::isa::Isa;

/// Render `d` (fetched from `pc`) as source text that assembles back to
/// the same word.
pub fn fmt_decoded(isa: &Isa, pc: u64, d: &Decoded) -> String {
    let Some(desc) = isa.by_code(d.opcode) else {
        return format!(".word opcode {}", d.opcode);
    };
    let mn = desc.mnemonic;
    let r = |i: u8| isa.register_name(i);

    match (d.format, d.rs, d.operand) {
        (Format::Branch, None, Operand::Literal(v)) => format!("{mn} {v}"),
        (Format::Branch, Some(base), Operand::Displacement(off)) => {
            let target = pc as i128 + off as i128;
            if base == 0 {
                format!("{mn} {target}")
            } else {
                format!("{mn} {}, {target}", r(base))
            }
        }
        (Format::Branch, Some(base), Operand::Literal(v)) => format!("{mn} {}, {v}", r(base)),
        (Format::Branch, Some(base), Operand::Scaled { index, shift, offset }) => {
            format!("{mn} {}, {}, {shift}, {offset}", r(base), r(index))
        }
        (_, None, Operand::Literal(v)) if desc.implicit_register => {
            if v == 0 {
                mn.to_string()
            } else {
                format!("{mn} {v}")
            }
        }
        (_, None, Operand::Literal(v)) => format!("{mn} {}, {v}", r(d.rd)),
        (_, Some(rs), Operand::Literal(v)) => {
            if v == 0 && isa.two_address {
                format!("{mn} {}, {}", r(d.rd), r(rs))
            } else {
                format!("{mn} {}, {}, {v}", r(d.rd), r(rs))
            }
        }
        (_, Some(rs), Operand::Scaled { index, shift, offset }) => {
            if Some(index) == isa.zero && shift == 0 {
                format!("{mn} {}, {}, {offset}", r(d.rd), r(rs))
            } else {
                format!("{mn} {}, {}, {}, {shift}, {offset}", r(d.rd), r(rs), r(index))
            }
        }
        (_, rs, operand) => format!("{mn} {} ; unrenderable {rs:?} {operand:?}", r(d.rd)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{Decoder, TableDecoder};
    use crate::isa::{MIPT32, MIPT64};

    #[test]
    fn renders_both_profiles() {
        let d32 = TableDecoder::new(&MIPT32);
        assert_eq!(fmt_decoded(&MIPT32, 0, &d32.decode(0x0212_0005).unwrap()), "add r1, r2, 5");
        assert_eq!(fmt_decoded(&MIPT32, 0, &d32.decode(0x2A00_0002).unwrap()), "ret 2");
        assert_eq!(fmt_decoded(&MIPT32, 0, &d32.decode(0x2E00_0010).unwrap()), "jmp 16");

        let d64 = TableDecoder::new(&MIPT64);
        let bl = (19u64 << 26) | (31 << 21) | (1 << 20) | 16;
        assert_eq!(fmt_decoded(&MIPT64, 64, &d64.decode(bl).unwrap()), "bl pc, 48");
        let ld = (28u64 << 26) | (1 << 21) | (29 << 16) | 8;
        assert_eq!(fmt_decoded(&MIPT64, 0, &d64.decode(ld).unwrap()), "ld r1, sp, 8");
    }
}
