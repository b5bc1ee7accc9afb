use crate::decoder::{Decoded, Operand};
use crate::instructions::Format;
use crate::isa::Isa;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{field} value {value} does not fit in {width} bits")]
    Overflow {
        field: &'static str,
        value: u64,
        width: u8,
    },
    #[error("{field} value {value} is negative")]
    Negative { field: &'static str, value: i64 },
    #[error("{form} operand is not encodable in {format:?} format")]
    Unsupported { form: &'static str, format: Format },
    #[error("opcode {0} is not defined")]
    UnknownOpcode(u8),
}

pub fn encode(isa: &Isa, d: &Decoded) -> Result<u64, EncodeError> {
    let desc = isa
        .by_code(d.opcode)
        .ok_or(EncodeError::UnknownOpcode(d.opcode))?;
    let layout = isa.layout(desc.format);
    let unsupported = |form| EncodeError::Unsupported {
        form,
        format: desc.format,
    };

    let mut raw = 0u64;
    isa.opcode.insert(&mut raw, u64::from(d.opcode), "opcode")?;
    if let Some(f) = layout.rd {
        f.insert(&mut raw, u64::from(d.rd), "register")?;
    }

    let base = match (layout.rs, d.rs) {
        (Some(f), Some(r)) => {
            f.insert(&mut raw, u64::from(r), "register")?;
            Some(r)
        }
        (None, None) => None,
        (Some(_), None) => return Err(unsupported("base-less")),
        (None, Some(_)) => return Err(unsupported("based")),
    };

    match d.operand {
        Operand::Literal(v) => {
            let scaled = base.and_then(|b| layout.scaled_for(b));
            match scaled {
                None if base.map_or(false, |b| layout.is_relative_base(b)) => {
                    return Err(unsupported("literal"))
                }
                None => layout.literal.insert(&mut raw, v, "literal")?,
                Some(sc) => {
                    let (wide, zero) = match (sc.wide, isa.zero) {
                        (Some(w), Some(z)) => (w, z),
                        _ => return Err(unsupported("literal")),
                    };
                    sc.index.insert(&mut raw, u64::from(zero), "index")?;
                    wide.insert(&mut raw, v, "literal")?;
                }
            }
        }
        Operand::Scaled {
            index,
            shift,
            offset,
        } => {
            let sc = base
                .and_then(|b| layout.scaled_for(b))
                .ok_or_else(|| unsupported("scaled"))?;
            if sc.wide.is_some() && Some(index) == isa.zero {
                return Err(unsupported("scaled"));
            }
            sc.index.insert(&mut raw, u64::from(index), "index")?;
            sc.shift.insert(&mut raw, u64::from(shift), "shift")?;
            sc.offset.insert(&mut raw, offset, "offset")?;
        }
        Operand::Displacement(v) => {
            let rel = match (layout.relative, base) {
                (Some(rel), Some(b)) if rel.bases.contains(&b) => rel,
                _ => return Err(unsupported("relative")),
            };
            rel.magnitude
                .insert(&mut raw, v.unsigned_abs(), "displacement")?;
            if v < 0 {
                raw |= 1 << rel.sign_bit;
            }
        }
    }
    Ok(raw)
}
