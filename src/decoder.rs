use serde::{Deserialize, Serialize};

use crate::instructions::{Format, Op, OpcodeDesc};
use crate::isa::Isa;

/// Second operand of an instruction as carried by the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Raw field bits.
    Literal(u64),
    /// `(reg[index] << shift) + offset`, evaluated at execution time.
    Scaled { index: u8, shift: u8, offset: u64 },
    /// Signed distance from the instruction to the branch target.
    Displacement(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub op: Op,
    pub opcode: u8,
    pub format: Format,
    pub rd: u8,
    /// Source or base register, for layouts that carry one.
    pub rs: Option<u8>,
    pub operand: Operand,
}

pub trait Decoder {
    fn decode(&self, raw: u64) -> Option<Decoded>;
}

/// Decoder driven by a machine descriptor: one table slot per opcode value.
pub struct TableDecoder {
    isa: &'static Isa,
    table: Vec<Option<&'static OpcodeDesc>>,
}

impl TableDecoder {
    pub fn new(isa: &'static Isa) -> Self {
        let mut table = vec![None; isa.opcode.max() as usize + 1];
        for desc in isa.opcodes {
            table[desc.code as usize] = Some(desc);
        }
        Self { isa, table }
    }

    pub fn isa(&self) -> &'static Isa {
        self.isa
    }
}

impl Decoder for TableDecoder {
    fn decode(&self, raw: u64) -> Option<Decoded> {
        let code = self.isa.opcode.extract(raw) as usize;
        let desc = (*self.table.get(code)?)?;
        let layout = self.isa.layout(desc.format);

        let rd = layout.rd.map_or(0, |f| f.extract(raw) as u8);
        let rs = layout.rs.map(|f| f.extract(raw) as u8);

        let operand = match rs {
            None => Operand::Literal(layout.literal.extract(raw)),
            Some(base) => match (layout.relative, layout.scaled_for(base)) {
                (Some(rel), _) if rel.bases.contains(&base) => {
                    let magnitude = rel.magnitude.extract(raw) as i64;
                    if (raw >> rel.sign_bit) & 1 == 1 {
                        Operand::Displacement(-magnitude)
                    } else {
                        Operand::Displacement(magnitude)
                    }
                }
                (_, Some(sc)) => {
                    let index = sc.index.extract(raw) as u8;
                    match sc.wide {
                        Some(wide) if Some(index) == self.isa.zero => {
                            Operand::Literal(wide.extract(raw))
                        }
                        _ => Operand::Scaled {
                            index,
                            shift: sc.shift.extract(raw) as u8,
                            offset: sc.offset.extract(raw),
                        },
                    }
                }
                _ => Operand::Literal(layout.literal.extract(raw)),
            },
        };

        Some(Decoded {
            op: desc.op,
            opcode: desc.code,
            format: desc.format,
            rd,
            rs,
            operand,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{MIPT32, MIPT64};

    #[test]
    fn unknown_opcode_is_not_decoded() {
        let dec = TableDecoder::new(&MIPT32);
        assert!(dec.decode(10 << 24).is_none());
        assert!(dec.decode(0xFF << 24).is_none());
    }

    #[test]
    fn mipt32_reg_reg_fields() {
        let dec = TableDecoder::new(&MIPT32);
        let d = dec.decode(0x0212_0005).unwrap();
        assert_eq!(d.op, Op::Add);
        assert_eq!(d.rd, 1);
        assert_eq!(d.rs, Some(2));
        assert_eq!(d.operand, Operand::Literal(5));
    }

    #[test]
    fn mipt64_branch_forms() {
        let dec = TableDecoder::new(&MIPT64);
        let bl = 19u64 << 26;
        let back = dec.decode(bl | (31 << 21) | (1 << 20) | 16).unwrap();
        assert_eq!(back.operand, Operand::Displacement(-16));
        let abs = dec.decode(bl | (27 << 21) | 0x100).unwrap();
        assert_eq!(abs.operand, Operand::Literal(0x100));
        let ind = dec.decode(bl | (5 << 21) | (6 << 16) | (3 << 13) | 4).unwrap();
        assert_eq!(
            ind.operand,
            Operand::Scaled {
                index: 6,
                shift: 3,
                offset: 4
            }
        );
    }

    #[test]
    fn mipt64_memory_wide_literal() {
        let dec = TableDecoder::new(&MIPT64);
        let ld = (28u64 << 26) | (1 << 21) | (4 << 16) | (27 << 11) | 0x7FF;
        assert_eq!(dec.decode(ld).unwrap().operand, Operand::Literal(0x7FF));
    }
}
