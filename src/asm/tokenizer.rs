use crate::isa::Isa;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Register(u8),
    Integer(i64),
    Float(f64),
    /// Label reference.
    Symbol(String),
}

impl Token {
    pub fn classify(isa: &Isa, s: &str) -> Token {
        if let Some(r) = isa.register(s) {
            return Token::Register(r);
        }
        if let Ok(v) = s.parse::<i64>() {
            return Token::Integer(v);
        }
        let numeric = s
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'));
        if numeric {
            if let Ok(v) = s.parse::<f64>() {
                return Token::Float(v);
            }
        }
        Token::Symbol(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub mnemonic: String,
    pub operands: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// 1-based source line.
    pub line: usize,
    pub text: String,
    pub label: Option<String>,
    pub body: Option<Body>,
}

fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
}

/// Lex one source line; blank and comment-only lines yield `None`.
pub fn tokenize_line(isa: &Isa, line: usize, text: &str) -> Option<Statement> {
    let code = text.split(';').next().unwrap_or("").trim();
    if code.is_empty() {
        return None;
    }

    let (label, rest) = match code.split_once(':') {
        Some((head, rest)) if !head.contains(|c: char| c.is_whitespace() || c == ',') => {
            (Some(head.to_string()), rest.trim())
        }
        _ => (None, code),
    };

    let mut it = words(rest);
    let body = it.next().map(|mn| Body {
        mnemonic: mn.to_ascii_lowercase(),
        operands: it.map(|w| Token::classify(isa, w)).collect(),
    });

    Some(Statement {
        line,
        text: code.to_string(),
        label,
        body,
    })
}

pub fn tokenize(isa: &Isa, src: &str) -> Vec<Statement> {
    src.lines()
        .enumerate()
        .filter_map(|(i, text)| tokenize_line(isa, i + 1, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{MIPT32, MIPT64};
    use pretty_assertions::assert_eq;

    #[test]
    fn label_mnemonic_and_operands() {
        let st = tokenize_line(&MIPT32, 3, "  loop:  ADDI r1,  -2 ; step").unwrap();
        assert_eq!(
            st,
            Statement {
                line: 3,
                text: "loop:  ADDI r1,  -2".into(),
                label: Some("loop".into()),
                body: Some(Body {
                    mnemonic: "addi".into(),
                    operands: vec![Token::Register(1), Token::Integer(-2)],
                }),
            }
        );
    }

    #[test]
    fn label_only_and_blank_lines() {
        let st = tokenize_line(&MIPT64, 1, "main:").unwrap();
        assert_eq!(st.label.as_deref(), Some("main"));
        assert!(st.body.is_none());
        assert!(tokenize_line(&MIPT64, 2, "   ; nothing").is_none());
        assert!(tokenize_line(&MIPT64, 3, "").is_none());
    }

    #[test]
    fn operand_classes() {
        let c = |s| Token::classify(&MIPT64, s);
        assert_eq!(c("rz"), Token::Register(27));
        assert_eq!(c("r3"), Token::Register(3));
        assert_eq!(c("+7"), Token::Integer(7));
        assert_eq!(c("2.5"), Token::Float(2.5));
        assert_eq!(c("-1e3"), Token::Float(-1000.0));
        assert_eq!(c("nan"), Token::Symbol("nan".into()));
        assert_eq!(c("ret_addr"), Token::Symbol("ret_addr".into()));
    }
}
