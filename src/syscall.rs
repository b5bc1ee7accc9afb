use std::io::{self, BufRead, BufWriter, Cursor, Stdin, StdinLock, Stdout, Write};

use tracing::warn;

use crate::cpu::Trap;
use crate::exec::{Ctx, Flow};

/// Input and output streams seen by a running program.
pub trait Console {
    /// Next whitespace-delimited token, `None` at end of input.
    fn read_token(&mut self) -> io::Result<Option<String>>;
    /// Next raw byte, whitespace included.
    fn read_char(&mut self) -> io::Result<Option<u8>>;
    fn write_text(&mut self, s: &str) -> io::Result<()>;
    fn write_byte(&mut self, b: u8) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

pub struct StreamConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StreamConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.fill_buf()?.first().copied())
    }
}

impl StreamConsole<StdinLock<'static>, BufWriter<Stdout>> {
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), BufWriter::new(io::stdout()))
    }
}

/// In-memory console for tests and embedding.
pub type BufferConsole = StreamConsole<Cursor<Vec<u8>>, Vec<u8>>;

impl StreamConsole<Cursor<Vec<u8>>, Vec<u8>> {
    pub fn buffered(input: impl Into<Vec<u8>>) -> Self {
        Self::new(Cursor::new(input.into()), Vec::new())
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl<R: BufRead, W: Write> Console for StreamConsole<R, W> {
    fn read_token(&mut self) -> io::Result<Option<String>> {
        while let Some(b) = self.peek_byte()? {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.input.consume(1);
        }
        let mut token = Vec::new();
        while let Some(b) = self.peek_byte()? {
            if b.is_ascii_whitespace() {
                break;
            }
            token.push(b);
            self.input.consume(1);
        }
        if token.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&token).into_owned()))
    }

    fn read_char(&mut self) -> io::Result<Option<u8>> {
        let b = self.peek_byte()?;
        if b.is_some() {
            self.input.consume(1);
        }
        Ok(b)
    }

    fn write_text(&mut self, s: &str) -> io::Result<()> {
        self.output.write_all(s.as_bytes())
    }

    fn write_byte(&mut self, b: u8) -> io::Result<()> {
        self.output.write_all(&[b])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Exit,
    ReadInt,
    ReadFloat,
    WriteInt,
    WriteFloat,
    ReadChar,
    WriteChar,
}

impl Syscall {
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => Syscall::Exit,
            100 => Syscall::ReadInt,
            101 => Syscall::ReadFloat,
            102 => Syscall::WriteInt,
            103 => Syscall::WriteFloat,
            104 => Syscall::ReadChar,
            105 => Syscall::WriteChar,
            _ => return None,
        })
    }
}

/// Perform service `code` on register `reg`.
pub(crate) fn service(cx: &mut Ctx<'_>, reg: u8, code: u64) -> Result<Flow, Trap> {
    let pc = cx.pc();
    let io_err = |source| Trap::Io { pc, source };
    let Some(call) = Syscall::from_code(code) else {
        if cx.m.cfg.strict_syscalls {
            return Err(Trap::UnsupportedSyscall { pc, code });
        }
        warn!(code, pc, "ignoring unsupported syscall");
        return Ok(Flow::Next);
    };

    match call {
        Syscall::Exit => return Ok(Flow::Halt(0)),
        Syscall::ReadInt => {
            let token = cx
                .io
                .read_token()
                .map_err(io_err)?
                .ok_or(Trap::InputExhausted { pc })?;
            let v = token
                .parse::<i64>()
                .ok()
                .filter(|&v| cx.isa.signed(cx.isa.mask(v as u64)) == v)
                .ok_or_else(|| Trap::BadInput {
                    pc,
                    token: token.clone(),
                })?;
            return cx.set(reg, v as u64);
        }
        Syscall::ReadFloat => {
            let token = cx
                .io
                .read_token()
                .map_err(io_err)?
                .ok_or(Trap::InputExhausted { pc })?;
            let v = token.parse::<f64>().map_err(|_| Trap::BadInput {
                pc,
                token: token.clone(),
            })?;
            return cx.write_float(reg, v);
        }
        Syscall::WriteInt => {
            let v = cx.isa.signed(cx.reg(reg)?);
            cx.io.write_text(&v.to_string()).map_err(io_err)?;
        }
        Syscall::WriteFloat => {
            let v = cx.read_float(reg)?;
            cx.io.write_text(&v.to_string()).map_err(io_err)?;
        }
        Syscall::ReadChar => {
            let b = cx
                .io
                .read_char()
                .map_err(io_err)?
                .ok_or(Trap::InputExhausted { pc })?;
            return cx.set(reg, u64::from(b));
        }
        Syscall::WriteChar => {
            let b = cx.reg(reg)? as u8;
            cx.io.write_byte(b).map_err(io_err)?;
        }
    }
    Ok(Flow::Next)
}
