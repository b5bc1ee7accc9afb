use tracing::debug;

use crate::alu;
use crate::encoder::{encode, EncodeError};
use crate::image::Image;
use crate::isa::Profile;

pub mod labels;
pub mod operands;
pub mod tokenizer;

pub use labels::LabelTable;
pub use tokenizer::{Body, Statement, Token};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AsmError {
    #[error("line {line}: {reason} in `{text}`")]
    Parse {
        line: usize,
        text: String,
        reason: String,
    },
    #[error("line {line}: unknown instruction `{mnemonic}`")]
    UnknownInstruction {
        line: usize,
        text: String,
        mnemonic: String,
    },
    #[error("line {line}: label `{name}` is already defined")]
    DuplicateLabel {
        line: usize,
        text: String,
        name: String,
    },
    #[error("line {line}: undefined label `{name}`")]
    UndefinedLabel {
        line: usize,
        text: String,
        name: String,
    },
    #[error("line {line}: {source} in `{text}`")]
    EncodingOverflow {
        line: usize,
        text: String,
        #[source]
        source: EncodeError,
    },
    #[error("line {line}: program does not fit in memory")]
    ImageOverflow { line: usize, text: String },
}

impl AsmError {
    pub fn line(&self) -> usize {
        match self {
            AsmError::Parse { line, .. }
            | AsmError::UnknownInstruction { line, .. }
            | AsmError::DuplicateLabel { line, .. }
            | AsmError::UndefinedLabel { line, .. }
            | AsmError::EncodingOverflow { line, .. }
            | AsmError::ImageOverflow { line, .. } => *line,
        }
    }
}

impl Statement {
    pub(crate) fn parse_error(&self, reason: impl Into<String>) -> AsmError {
        AsmError::Parse {
            line: self.line,
            text: self.text.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn encode_error(&self, source: EncodeError) -> AsmError {
        AsmError::EncodingOverflow {
            line: self.line,
            text: self.text.clone(),
            source,
        }
    }
}

/// Assemble `src` for `profile` into a memory image.
pub fn assemble(profile: Profile, src: &str) -> Result<Image, AsmError> {
    let isa = profile.isa();
    let stmts = tokenizer::tokenize(isa, src);
    let labels = labels::resolve(isa, &stmts)?;

    let capacity = isa.address_space / isa.unit();
    let mut words: Vec<u64> = Vec::new();
    let mut code_words = 0u64;
    let mut data_words = 0u64;
    let mut entry = 0u64;

    for st in &stmts {
        let Some(body) = &st.body else { continue };
        let Some(footprint) = labels::footprint(isa, st, body)? else {
            entry = match body.operands.as_slice() {
                [Token::Symbol(name)] => match labels.get(name) {
                    Some(&addr) => addr,
                    None => {
                        return Err(AsmError::UndefinedLabel {
                            line: st.line,
                            text: st.text.clone(),
                            name: name.clone(),
                        })
                    }
                },
                [Token::Integer(v)] if *v >= 0 => *v as u64,
                _ => return Err(st.parse_error("`end` takes the entry label")),
            };
            break;
        };
        if (words.len() as u64).saturating_add(footprint) > capacity {
            return Err(AsmError::ImageOverflow {
                line: st.line,
                text: st.text.clone(),
            });
        }

        match body.mnemonic.as_str() {
            "word" => {
                let v = match body.operands.as_slice() {
                    [Token::Integer(v)] => *v,
                    [Token::Symbol(name)] => match labels.get(name) {
                        Some(&addr) => addr as i64,
                        None => {
                            return Err(AsmError::UndefinedLabel {
                                line: st.line,
                                text: st.text.clone(),
                                name: name.clone(),
                            })
                        }
                    },
                    _ => return Err(st.parse_error("`word` takes one integer")),
                };
                let fits = isa.word_bits >= 64
                    || (-(1i64 << (isa.word_bits - 1))..(1i64 << isa.word_bits)).contains(&v);
                if !fits {
                    return Err(st.encode_error(EncodeError::Overflow {
                        field: "word",
                        value: v as u64,
                        width: isa.word_bits as u8,
                    }));
                }
                words.push(isa.mask(v as u64));
                data_words += 1;
            }
            "double" => {
                let v = match body.operands.as_slice() {
                    [Token::Float(v)] => *v,
                    [Token::Integer(v)] => *v as f64,
                    _ => return Err(st.parse_error("`double` takes one floating literal")),
                };
                let bits = alu::f64_to_bits(v);
                if isa.float_words == 2 {
                    let (lo, hi) = alu::split_halves(bits);
                    words.extend([lo, hi]);
                } else {
                    words.push(bits);
                }
                data_words += u64::from(isa.float_words);
            }
            "bytes" => {
                words.resize(words.len() + footprint as usize, 0);
                data_words += footprint;
            }
            mnemonic => {
                let desc = isa
                    .by_mnemonic(mnemonic)
                    .ok_or_else(|| AsmError::UnknownInstruction {
                        line: st.line,
                        text: st.text.clone(),
                        mnemonic: mnemonic.to_string(),
                    })?;
                let site = words.len() as u64 * isa.unit();
                let d = operands::build(isa, desc, &body.operands, &labels, st, site)?;
                let raw = encode(isa, &d).map_err(|e| st.encode_error(e))?;
                words.push(raw);
                code_words += 1;
            }
        }
    }

    debug!(
        profile = %profile,
        code_words,
        data_words,
        entry,
        "assembled"
    );
    Ok(Image {
        profile,
        words,
        entry,
        code_words,
        data_words,
        labels,
    })
}
