use crate::alu;
use crate::cpu::{Machine, Trap};
use crate::decoder::{Decoded, Operand};
use crate::instructions::Op;
use crate::isa::Isa;
use crate::memory::Bus;
use crate::syscall::{self, Console};

/// What a handler wants done with the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to the following word.
    Next,
    Jump(u64),
    Halt(i32),
}

pub trait Executor {
    fn exec(
        &self,
        m: &mut Machine,
        bus: &mut dyn Bus,
        io: &mut dyn Console,
        d: &Decoded,
    ) -> Result<Flow, Trap>;
}

/// Everything a handler may touch while one instruction executes.
pub(crate) struct Ctx<'a> {
    pub isa: &'static Isa,
    pub m: &'a mut Machine,
    pub bus: &'a mut dyn Bus,
    pub io: &'a mut dyn Console,
}

type Handler = fn(&mut Ctx<'_>, &Decoded) -> Result<Flow, Trap>;

/// Executor with one handler slot per opcode value, filled from the descriptor.
pub struct DispatchExecutor {
    isa: &'static Isa,
    table: Vec<Option<Handler>>,
}

impl DispatchExecutor {
    pub fn new(isa: &'static Isa) -> Self {
        let mut table: Vec<Option<Handler>> = vec![None; isa.opcode.max() as usize + 1];
        for desc in isa.opcodes {
            table[desc.code as usize] = Some(handler(desc.op));
        }
        Self { isa, table }
    }
}

impl Executor for DispatchExecutor {
    fn exec(
        &self,
        m: &mut Machine,
        bus: &mut dyn Bus,
        io: &mut dyn Console,
        d: &Decoded,
    ) -> Result<Flow, Trap> {
        let Some(h) = self.table.get(d.opcode as usize).copied().flatten() else {
            return Err(Trap::InvalidInstruction {
                pc: m.pc(),
                raw: u64::from(d.opcode) << self.isa.opcode.lo,
            });
        };
        let mut cx = Ctx {
            isa: self.isa,
            m,
            bus,
            io,
        };
        h(&mut cx, d)
    }
}

fn handler(op: Op) -> Handler {
    match op {
        Op::Halt => halt,
        Op::Syscall => system_call,
        Op::Add => add,
        Op::Sub => |cx, d| cx.binary(d, |_, a, b| Ok(a.wrapping_sub(b))),
        Op::Mul => |cx, d| cx.binary(d, |_, a, b| Ok(a.wrapping_mul(b))),
        Op::Div => |cx, d| cx.binary(d, |isa, a, b| Ok(alu::div_rem(isa, a, b)?.0)),
        Op::Rem => |cx, d| cx.binary(d, |isa, a, b| Ok(alu::div_rem(isa, a, b)?.1)),
        Op::And => |cx, d| cx.binary(d, |_, a, b| Ok(a & b)),
        Op::Or => |cx, d| cx.binary(d, |_, a, b| Ok(a | b)),
        Op::Xor => |cx, d| cx.binary(d, |_, a, b| Ok(a ^ b)),
        Op::Nand => |cx, d| cx.binary(d, |_, a, b| Ok(!(a & b))),
        Op::Shl => |cx, d| cx.binary(d, |isa, a, b| Ok(alu::shift_left(isa, a, b))),
        Op::Shr => |cx, d| cx.binary(d, |isa, a, b| Ok(alu::shift_right(isa, a, b))),
        Op::Not => not,
        Op::MulWide => mul_wide,
        Op::DivWide => div_wide,
        Op::Move => mov,
        Op::FAdd => |cx, d| cx.float_binary(d, |a, b| a + b),
        Op::FSub => |cx, d| cx.float_binary(d, |a, b| a - b),
        Op::FMul => |cx, d| cx.float_binary(d, |a, b| a * b),
        Op::FDiv => |cx, d| cx.float_binary(d, |a, b| a / b),
        Op::IntToFloat => int_to_float,
        Op::FloatToInt => float_to_int,
        Op::Cmp => cmp,
        Op::FCmp => fcmp,
        Op::Push => push,
        Op::Pop => pop,
        Op::Call => call,
        Op::CallDirect => call_direct,
        Op::Return => ret,
        Op::BranchLink => branch_link,
        Op::Jump => jump,
        Op::CondJump(_) => cond_jump,
        Op::CondMove(_) => cond_move,
        Op::Load => load,
        Op::Store => store,
        Op::LoadPair => load_pair,
        Op::StorePair => store_pair,
    }
}

impl Ctx<'_> {
    pub fn pc(&self) -> u64 {
        self.m.pc()
    }

    fn arith(&self, reason: &'static str) -> Trap {
        Trap::Arithmetic {
            pc: self.pc(),
            reason,
        }
    }

    pub fn reg(&self, r: u8) -> Result<u64, Trap> {
        self.m.reg(r)
    }

    /// Register write as seen by an instruction: writing pc is a jump.
    pub fn set(&mut self, r: u8, v: u64) -> Result<Flow, Trap> {
        if r == self.isa.pc {
            return Ok(Flow::Jump(self.isa.mask(v)));
        }
        self.m.set_reg(r, v)?;
        Ok(Flow::Next)
    }

    fn check_pair(&self, r: u8) -> Result<(), Trap> {
        if r + 1 >= self.isa.gpr_count {
            return Err(Trap::BadRegister {
                pc: self.pc(),
                index: u64::from(r) + 1,
            });
        }
        Ok(())
    }

    fn set_pair(&mut self, r: u8, lo: u64, hi: u64) -> Result<Flow, Trap> {
        self.check_pair(r)?;
        self.m.set_reg(r, lo)?;
        self.m.set_reg(r + 1, hi)?;
        Ok(Flow::Next)
    }

    pub fn read_float(&self, r: u8) -> Result<f64, Trap> {
        let bits = if self.isa.float_words == 2 {
            self.check_pair(r)?;
            alu::join_halves(self.reg(r)?, self.reg(r + 1)?)
        } else {
            self.reg(r)?
        };
        Ok(alu::bits_to_f64(bits))
    }

    pub fn write_float(&mut self, r: u8, v: f64) -> Result<Flow, Trap> {
        let bits = alu::f64_to_bits(v);
        if self.isa.float_words == 2 {
            let (lo, hi) = alu::split_halves(bits);
            self.set_pair(r, lo, hi)
        } else {
            self.set(r, bits)
        }
    }

    /// Integer value of the operand field alone.
    fn operand(&self, d: &Decoded) -> Result<u64, Trap> {
        let v = match d.operand {
            Operand::Literal(v) => v,
            Operand::Scaled {
                index,
                shift,
                offset,
            } => alu::shift_left(self.isa, self.reg(index)?, shift.into()).wrapping_add(offset),
            Operand::Displacement(v) => self.pc().wrapping_add_signed(v),
        };
        Ok(self.isa.mask(v))
    }

    /// Operand field as a float: literals count as integers, scaled forms
    /// fold to `f(reg[index]) * 2^shift + offset`.
    fn float_operand(&self, d: &Decoded) -> Result<f64, Trap> {
        match d.operand {
            Operand::Scaled {
                index,
                shift,
                offset,
            } => Ok(self.read_float(index)? * f64::from(1u32 << shift) + offset as f64),
            _ => Ok(self.operand(d)? as f64),
        }
    }

    /// `reg[rs] + operand`, or the operand alone where there is no register.
    fn based(&self, d: &Decoded) -> Result<u64, Trap> {
        let base = match d.rs {
            Some(r) => self.reg(r)?,
            None => 0,
        };
        Ok(self.isa.mask(base.wrapping_add(self.operand(d)?)))
    }

    /// First operand: the destination on a two-address machine, the source
    /// register otherwise.
    fn lhs(&self, d: &Decoded) -> Result<u64, Trap> {
        if self.isa.two_address {
            self.reg(d.rd)
        } else {
            d.rs.map_or(Ok(0), |r| self.reg(r))
        }
    }

    fn rhs(&self, d: &Decoded) -> Result<u64, Trap> {
        if self.isa.two_address {
            self.based(d)
        } else {
            self.operand(d)
        }
    }

    fn is_absolute_jump(&self, d: &Decoded) -> bool {
        self.isa.pc_to_pc_absolute && d.rd == self.isa.pc && d.rs == Some(self.isa.pc)
    }

    /// Value moved into the destination by move-like instructions.
    fn source(&self, d: &Decoded) -> Result<u64, Trap> {
        if self.is_absolute_jump(d) {
            self.operand(d)
        } else if self.isa.two_address {
            self.rhs(d)
        } else {
            Ok(self.isa.mask(self.lhs(d)?.wrapping_add(self.rhs(d)?)))
        }
    }

    fn float_lhs(&self, d: &Decoded) -> Result<f64, Trap> {
        if self.isa.two_address {
            self.read_float(d.rd)
        } else {
            d.rs.map_or(Ok(0.0), |r| self.read_float(r))
        }
    }

    fn float_rhs(&self, d: &Decoded) -> Result<f64, Trap> {
        if self.isa.two_address {
            let base = d.rs.map_or(Ok(0.0), |r| self.read_float(r))?;
            Ok(base + self.operand(d)? as f64)
        } else {
            self.float_operand(d)
        }
    }

    fn float_source(&self, d: &Decoded) -> Result<f64, Trap> {
        if self.isa.two_address {
            self.float_rhs(d)
        } else {
            Ok(self.float_lhs(d)? + self.float_rhs(d)?)
        }
    }

    /// Branch or call destination.
    fn target(&self, d: &Decoded) -> Result<u64, Trap> {
        match d.operand {
            Operand::Displacement(_) => self.operand(d),
            _ => self.based(d),
        }
    }

    fn is_stack_access(&self, d: &Decoded) -> bool {
        self.isa.stack_via_base && d.rs == Some(self.isa.sp)
    }

    fn load(&mut self, addr: u64) -> Result<u64, Trap> {
        let pc = self.pc();
        self.bus
            .read_word(addr)
            .map_err(|source| Trap::OutOfBounds { pc, addr, source })
    }

    fn store(&mut self, addr: u64, v: u64) -> Result<(), Trap> {
        let pc = self.pc();
        self.bus
            .write_word(addr, v)
            .map_err(|source| Trap::OutOfBounds { pc, addr, source })
    }

    fn sp(&self) -> u64 {
        self.m.regs[usize::from(self.isa.sp)]
    }

    /// Move the stack pointer down by `step` units, then store.
    fn push(&mut self, v: u64, step: u64) -> Result<(), Trap> {
        let sp = self.isa.mask(self.sp().wrapping_sub(step));
        self.store(sp, v)?;
        self.m.set_reg(self.isa.sp, sp)
    }

    /// Load the top word, then move the stack pointer up by `step` units.
    fn pop(&mut self, step: u64) -> Result<u64, Trap> {
        let sp = self.sp();
        let v = self.load(sp)?;
        self.m.set_reg(self.isa.sp, sp.wrapping_add(step))?;
        Ok(v)
    }

    fn binary(
        &mut self,
        d: &Decoded,
        f: impl FnOnce(&Isa, u64, u64) -> Result<u64, &'static str>,
    ) -> Result<Flow, Trap> {
        let (a, b) = (self.lhs(d)?, self.rhs(d)?);
        let v = f(self.isa, a, b).map_err(|reason| self.arith(reason))?;
        self.set(d.rd, v)
    }

    fn float_binary(&mut self, d: &Decoded, f: impl FnOnce(f64, f64) -> f64) -> Result<Flow, Trap> {
        let (a, b) = (self.float_lhs(d)?, self.float_rhs(d)?);
        self.write_float(d.rd, f(a, b))
    }

    fn next_instruction(&self) -> u64 {
        self.isa.mask(self.pc().wrapping_add(self.isa.unit()))
    }
}

fn halt(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    Ok(Flow::Halt(cx.isa.signed(cx.rhs(d)?) as i32))
}

fn system_call(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let code = cx.rhs(d)?;
    syscall::service(cx, d.rd, code)
}

fn add(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    if cx.is_absolute_jump(d) {
        let v = cx.operand(d)?;
        return cx.set(d.rd, v);
    }
    cx.binary(d, |_, a, b| Ok(a.wrapping_add(b)))
}

fn not(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let v = !cx.lhs(d)?;
    cx.set(d.rd, v)
}

fn mov(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let v = cx.source(d)?;
    cx.set(d.rd, v)
}

fn mul_wide(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let (lo, hi) = alu::mul_wide(cx.lhs(d)?, cx.rhs(d)?);
    cx.set_pair(d.rd, lo, hi)
}

fn div_wide(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    cx.check_pair(d.rd)?;
    let (lo, hi) = (cx.reg(d.rd)?, cx.reg(d.rd + 1)?);
    let (q, r) = alu::div_wide(lo, hi, cx.rhs(d)?).map_err(|reason| cx.arith(reason))?;
    cx.set_pair(d.rd, q, r)
}

fn int_to_float(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let v = alu::int_to_float(cx.isa, cx.source(d)?);
    cx.write_float(d.rd, v)
}

fn float_to_int(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let f = cx.float_source(d)?;
    let v = alu::float_to_int(cx.isa, f).ok_or_else(|| cx.arith("float out of integer range"))?;
    cx.set(d.rd, v)
}

fn cmp(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let (a, b) = (cx.reg(d.rd)?, cx.source(d)?);
    cx.m.flag = alu::compare_int(cx.isa, a, b);
    Ok(Flow::Next)
}

fn fcmp(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let (a, b) = (cx.read_float(d.rd)?, cx.float_source(d)?);
    cx.m.flag = alu::compare_float(a, b);
    Ok(Flow::Next)
}

fn push(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let v = cx.reg(d.rd)?.wrapping_add(cx.rhs(d)?);
    cx.push(v, cx.isa.unit())?;
    Ok(Flow::Next)
}

fn pop(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let v = cx.pop(cx.isa.unit())?.wrapping_add(cx.rhs(d)?);
    cx.set(d.rd, v)
}

fn call(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let target = cx.target(d)?;
    let ret = cx.next_instruction();
    cx.push(ret, cx.isa.unit())?;
    let sp = cx.sp();
    cx.m.set_reg(d.rd, sp)?;
    Ok(Flow::Jump(target))
}

fn call_direct(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let target = cx.target(d)?;
    let ret = cx.next_instruction();
    cx.push(ret, cx.isa.unit())?;
    Ok(Flow::Jump(target))
}

fn ret(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let extra = cx.rhs(d)?;
    let to = cx.pop(cx.isa.unit().wrapping_add(extra))?;
    Ok(Flow::Jump(to))
}

fn branch_link(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let target = cx.target(d)?;
    if let Some(lr) = cx.isa.link {
        let ret = cx.next_instruction();
        cx.m.set_reg(lr, ret)?;
    }
    Ok(Flow::Jump(target))
}

fn jump(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    Ok(Flow::Jump(cx.target(d)?))
}

fn cond_jump(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    match d.op.cond() {
        Some(c) if c.holds(cx.m.flag) => jump(cx, d),
        _ => Ok(Flow::Next),
    }
}

fn cond_move(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    match d.op.cond() {
        Some(c) if c.holds(cx.m.flag) => mov(cx, d),
        _ => Ok(Flow::Next),
    }
}

fn load(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let v = if cx.is_stack_access(d) {
        // the operand is the whole stack pointer move
        let step = cx.operand(d)?;
        cx.pop(step)?
    } else {
        let addr = cx.based(d)?;
        cx.load(addr)?
    };
    cx.set(d.rd, v)
}

fn store(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    let v = cx.reg(d.rd)?;
    if cx.is_stack_access(d) {
        let step = cx.operand(d)?;
        cx.push(v, step)?;
    } else {
        let addr = cx.based(d)?;
        cx.store(addr, v)?;
    }
    Ok(Flow::Next)
}

fn load_pair(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    cx.check_pair(d.rd)?;
    let addr = cx.based(d)?;
    let lo = cx.load(addr)?;
    let hi = cx.load(cx.isa.mask(addr.wrapping_add(cx.isa.unit())))?;
    cx.set_pair(d.rd, lo, hi)
}

fn store_pair(cx: &mut Ctx<'_>, d: &Decoded) -> Result<Flow, Trap> {
    cx.check_pair(d.rd)?;
    let (lo, hi) = (cx.reg(d.rd)?, cx.reg(d.rd + 1)?);
    let addr = cx.based(d)?;
    let next = cx.isa.mask(addr.wrapping_add(cx.isa.unit()));
    // probe both words so a fault leaves memory untouched
    cx.load(addr)?;
    cx.load(next)?;
    cx.store(addr, lo)?;
    cx.store(next, hi)?;
    Ok(Flow::Next)
}
