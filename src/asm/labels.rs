use std::collections::BTreeMap;

use tracing::debug;

use super::tokenizer::{Body, Statement, Token};
use super::AsmError;
use crate::isa::Isa;

pub type LabelTable = BTreeMap<String, u64>;

/// Words a statement body occupies in the image; `None` for `end`.
pub(crate) fn footprint(isa: &Isa, st: &Statement, body: &Body) -> Result<Option<u64>, AsmError> {
    let words = match body.mnemonic.as_str() {
        "end" => return Ok(None),
        "double" => u64::from(isa.float_words),
        "bytes" => match body.operands.as_slice() {
            [Token::Integer(n)] if *n >= 0 => (*n as u64).div_ceil(isa.word_bytes()),
            _ => return Err(st.parse_error("`bytes` takes one non-negative count")),
        },
        _ => 1,
    };
    Ok(Some(words))
}

pub fn resolve(isa: &Isa, stmts: &[Statement]) -> Result<LabelTable, AsmError> {
    let mut labels = LabelTable::new();
    let mut addr = 0u64;
    for st in stmts {
        if let Some(name) = &st.label {
            if name.is_empty() {
                return Err(st.parse_error("empty label name"));
            }
            if labels.insert(name.clone(), addr).is_some() {
                return Err(AsmError::DuplicateLabel {
                    line: st.line,
                    text: st.text.clone(),
                    name: name.clone(),
                });
            }
        }
        let Some(body) = &st.body else { continue };
        match footprint(isa, st, body)? {
            Some(words) => addr = addr.saturating_add(words.saturating_mul(isa.unit())),
            None => break,
        }
    }
    debug!(count = labels.len(), "resolved labels");
    Ok(labels)
}
