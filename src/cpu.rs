use std::cmp::Ordering;
use std::io;

use anyhow::Error;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::decoder::Decoder;
use crate::disasm::fmt_decoded;
use crate::exec::{Executor, Flow};
use crate::instructions::FlagSet;
use crate::isa::{Isa, Profile};
use crate::memory::Bus;
use crate::syscall::Console;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Abort with [`Trap::StepLimit`] after this many instructions.
    pub step_limit: Option<u64>,
    /// Unknown syscall codes trap instead of being skipped.
    pub strict_syscalls: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            step_limit: None,
            strict_syscalls: true,
        }
    }
}

/// Result of the last comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Flag {
    #[default]
    Equal = 0,
    Less = 1,
    Greater = 2,
}

impl Flag {
    pub fn from_ordering(o: Ordering) -> Self {
        match o {
            Ordering::Equal => Flag::Equal,
            Ordering::Less => Flag::Less,
            Ordering::Greater => Flag::Greater,
        }
    }

    pub fn as_set(self) -> FlagSet {
        match self {
            Flag::Equal => FlagSet::EQUAL,
            Flag::Less => FlagSet::LESS,
            Flag::Greater => FlagSet::GREATER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Running,
    Halted(i32),
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("Invalid instruction {raw:#x} at {pc:#x}")]
    InvalidInstruction { pc: u64, raw: u64 },
    #[error("Bus error at {addr:#x} (pc {pc:#x}): {source}")]
    OutOfBounds {
        pc: u64,
        addr: u64,
        #[source]
        source: Error,
    },
    #[error("Register {index} does not exist (pc {pc:#x})")]
    BadRegister { pc: u64, index: u64 },
    #[error("Arithmetic error at {pc:#x}: {reason}")]
    Arithmetic { pc: u64, reason: &'static str },
    #[error("Unsupported syscall {code} at {pc:#x}")]
    UnsupportedSyscall { pc: u64, code: u64 },
    #[error("Input exhausted at {pc:#x}")]
    InputExhausted { pc: u64 },
    #[error("Malformed input {token:?} at {pc:#x}")]
    BadInput { pc: u64, token: String },
    #[error("I/O error at {pc:#x}: {source}")]
    Io {
        pc: u64,
        #[source]
        source: io::Error,
    },
    #[error("Step limit of {limit} instructions reached")]
    StepLimit { limit: u64 },
}

/// Architectural state: register file, comparison flag and step counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub profile: Profile,
    pub regs: Vec<u64>,
    pub flag: Flag,
    pub steps: u64,
    pub cfg: MachineConfig,
}

impl Machine {
    pub fn new(profile: Profile, cfg: MachineConfig) -> Self {
        let mut m = Self {
            profile,
            regs: vec![0; usize::from(profile.isa().gpr_count)],
            flag: Flag::Equal,
            steps: 0,
            cfg,
        };
        m.reset(0);
        m
    }

    pub fn isa(&self) -> &'static Isa {
        self.profile.isa()
    }

    /// Clear registers and flag, put the stack at the top of memory and
    /// the program counter at `entry`.
    pub fn reset(&mut self, entry: u64) {
        let isa = self.isa();
        self.regs.iter_mut().for_each(|r| *r = 0);
        self.regs[usize::from(isa.sp)] = isa.mask(isa.initial_sp());
        self.regs[usize::from(isa.pc)] = isa.mask(entry);
        self.flag = Flag::Equal;
        self.steps = 0;
    }

    pub fn pc(&self) -> u64 {
        self.regs[usize::from(self.isa().pc)]
    }

    pub fn set_pc(&mut self, v: u64) {
        let isa = self.isa();
        self.regs[usize::from(isa.pc)] = isa.mask(v);
    }

    pub fn reg(&self, idx: u8) -> Result<u64, Trap> {
        if Some(idx) == self.isa().zero {
            return Ok(0);
        }
        self.regs
            .get(usize::from(idx))
            .copied()
            .ok_or(Trap::BadRegister {
                pc: self.pc(),
                index: idx.into(),
            })
    }

    /// Plain register write; the zero register swallows it.
    pub fn set_reg(&mut self, idx: u8, v: u64) -> Result<(), Trap> {
        let isa = self.isa();
        if Some(idx) == isa.zero {
            return Ok(());
        }
        let pc = self.pc();
        let slot = self
            .regs
            .get_mut(usize::from(idx))
            .ok_or(Trap::BadRegister {
                pc,
                index: idx.into(),
            })?;
        *slot = isa.mask(v);
        Ok(())
    }

    pub fn step<D: Decoder, X: Executor>(
        &mut self,
        bus: &mut dyn Bus,
        io: &mut dyn Console,
        dec: &D,
        exec: &X,
    ) -> Result<Step, Trap> {
        if let Some(limit) = self.cfg.step_limit {
            if self.steps >= limit {
                return Err(Trap::StepLimit { limit });
            }
        }
        let isa = self.isa();
        let pc = self.pc();
        let raw = bus.read_word(pc).map_err(|source| Trap::OutOfBounds {
            pc,
            addr: pc,
            source,
        })?;
        let d = dec.decode(raw).ok_or(Trap::InvalidInstruction { pc, raw })?;
        trace!("{pc:#08x}: {}", fmt_decoded(isa, pc, &d));
        self.steps += 1;

        match exec.exec(self, bus, io, &d)? {
            Flow::Next => self.set_pc(pc.wrapping_add(isa.unit())),
            Flow::Jump(target) => self.set_pc(target),
            Flow::Halt(code) => return Ok(Step::Halted(code)),
        }
        Ok(Step::Running)
    }

    /// Step until the program halts, returning its exit status.
    pub fn run<D: Decoder, X: Executor>(
        &mut self,
        bus: &mut dyn Bus,
        io: &mut dyn Console,
        dec: &D,
        exec: &X,
    ) -> Result<i32, Trap> {
        loop {
            if let Step::Halted(code) = self.step(bus, io, dec, exec)? {
                return Ok(code);
            }
        }
    }
}
