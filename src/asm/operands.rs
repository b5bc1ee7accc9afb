use super::labels::LabelTable;
use super::tokenizer::{Statement, Token};
use super::AsmError;
use crate::decoder::{Decoded, Operand};
use crate::encoder::EncodeError;
use crate::instructions::{Format, OpcodeDesc};
use crate::isa::{Isa, Layout};

struct Operands<'a> {
    isa: &'a Isa,
    st: &'a Statement,
    labels: &'a LabelTable,
}

impl Operands<'_> {
    fn register(&self, tok: &Token) -> Result<u8, AsmError> {
        match tok {
            Token::Register(r) if *r < self.isa.gpr_count => Ok(*r),
            Token::Register(r) => Err(self.st.parse_error(format!("no register r{r}"))),
            other => Err(self.st.parse_error(format!("expected a register, found {other:?}"))),
        }
    }

    fn value(&self, tok: &Token) -> Result<i64, AsmError> {
        match tok {
            Token::Integer(v) => Ok(*v),
            Token::Symbol(name) => match self.labels.get(name) {
                Some(&addr) => Ok(addr as i64),
                None => Err(AsmError::UndefinedLabel {
                    line: self.st.line,
                    text: self.st.text.clone(),
                    name: name.clone(),
                }),
            },
            Token::Register(_) => Err(self.st.parse_error("expected a value, found a register")),
            Token::Float(_) => Err(self.st.parse_error("floating literal is only valid after `double`")),
        }
    }

    fn unsigned(&self, v: i64, field: &'static str) -> Result<u64, AsmError> {
        u64::try_from(v).map_err(|_| self.st.encode_error(EncodeError::Negative { field, value: v }))
    }

    fn optional_value(&self, tok: Option<&Token>) -> Result<i64, AsmError> {
        tok.map_or(Ok(0), |t| self.value(t))
    }

    fn zero(&self) -> Result<u8, AsmError> {
        self.isa
            .zero
            .ok_or_else(|| self.st.parse_error("this machine has no zero register"))
    }

    /// Operand for `base` plus a plain value, picking the form the base selects.
    fn with_base(&self, layout: &Layout, base: u8, v: i64, site: u64) -> Result<Operand, AsmError> {
        if layout.is_relative_base(base) {
            return Ok(Operand::Displacement(v.wrapping_sub(site as i64)));
        }
        match layout.scaled_for(base) {
            None => Ok(Operand::Literal(self.unsigned(v, "literal")?)),
            Some(sc) if sc.wide.is_some() => Ok(Operand::Literal(self.unsigned(v, "literal")?)),
            Some(_) => Ok(Operand::Scaled {
                index: self.zero()?,
                shift: 0,
                offset: self.unsigned(v, "offset")?,
            }),
        }
    }

    /// Explicit `base, index, shift, offset` form.
    fn scaled(&self, layout: &Layout, base: u8, rest: &[Token]) -> Result<Operand, AsmError> {
        let [index, shift, offset] = rest else {
            return Err(self.st.parse_error("scaled operand takes index, shift and offset"));
        };
        let Some(sc) = layout.scaled_for(base) else {
            return Err(self.st.parse_error("this base register does not take an index"));
        };
        let index = self.register(index)?;
        let shift = self.unsigned(self.value(shift)?, "shift")?;
        let offset = self.unsigned(self.value(offset)?, "offset")?;
        let shift = u8::try_from(shift).map_err(|_| {
            self.st.encode_error(EncodeError::Overflow {
                field: "shift",
                value: shift,
                width: sc.shift.width,
            })
        })?;
        if sc.wide.is_some() && Some(index) == self.isa.zero {
            // a zero index reads as the wide literal form
            return Ok(Operand::Literal(offset));
        }
        Ok(Operand::Scaled {
            index,
            shift,
            offset,
        })
    }
}

/// Build the instruction for `desc` located at address `site`.
pub(crate) fn build(
    isa: &Isa,
    desc: &OpcodeDesc,
    ops: &[Token],
    labels: &LabelTable,
    st: &Statement,
    site: u64,
) -> Result<Decoded, AsmError> {
    let cx = Operands { isa, st, labels };
    let layout = isa.layout(desc.format);
    let too_many = || st.parse_error(format!("too many operands for `{}`", desc.mnemonic));

    let (rd, rest) = match (layout.rd, desc.implicit_register) {
        (Some(_), false) => match ops.split_first() {
            Some((first, rest)) => (cx.register(first)?, rest),
            None => return Err(st.parse_error(format!("`{}` needs a register", desc.mnemonic))),
        },
        _ => (0, ops),
    };

    let (rs, operand) = match layout.rs {
        None => {
            let v = match (desc.format, rest) {
                (Format::Branch, [target]) => cx.value(target)?,
                (Format::Branch, []) => return Err(st.parse_error("missing branch target")),
                (_, [] | [_]) => cx.optional_value(rest.first())?,
                _ => return Err(too_many()),
            };
            (None, Operand::Literal(cx.unsigned(v, "literal")?))
        }
        Some(_) => match rest {
            [] if desc.format == Format::Branch => {
                return Err(st.parse_error("missing branch target"))
            }
            [] => return Err(st.parse_error("missing source operand")),
            [Token::Register(_), ..] => {
                let base = cx.register(&rest[0])?;
                let operand = match &rest[1..] {
                    [] if desc.format == Format::Branch => {
                        return Err(st.parse_error("missing branch target"))
                    }
                    [] => cx.with_base(layout, base, 0, site)?,
                    [v] => cx.with_base(layout, base, cx.value(v)?, site)?,
                    more @ [_, _, _] => cx.scaled(layout, base, more)?,
                    _ => return Err(too_many()),
                };
                (Some(base), operand)
            }
            [v] => {
                let base = match layout.relative.and_then(|rel| rel.bases.first().copied()) {
                    Some(b) if desc.format == Format::Branch => b,
                    _ => cx.zero()?,
                };
                (Some(base), cx.with_base(layout, base, cx.value(v)?, site)?)
            }
            _ => return Err(too_many()),
        },
    };

    Ok(Decoded {
        op: desc.op,
        opcode: desc.code,
        format: desc.format,
        rd,
        rs,
        operand,
    })
}
