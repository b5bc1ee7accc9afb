use std::cmp::Ordering;

use num_traits::ToPrimitive;

use crate::cpu::Flag;
use crate::isa::Isa;

pub fn bits_to_f64(bits: u64) -> f64 {
    f64::from_bits(bits)
}

pub fn f64_to_bits(v: f64) -> u64 {
    v.to_bits()
}

/// Combine two 32-bit register halves, low word first.
pub fn join_halves(lo: u64, hi: u64) -> u64 {
    (lo & 0xFFFF_FFFF) | (hi << 32)
}

pub fn split_halves(v: u64) -> (u64, u64) {
    (v & 0xFFFF_FFFF, v >> 32)
}

/// Truncate toward zero into a signed word; `None` for NaN or out of range.
pub fn float_to_int(isa: &Isa, v: f64) -> Option<u64> {
    let n = if isa.word_bits == 32 {
        i64::from(v.to_i32()?)
    } else {
        v.to_i64()?
    };
    Some(isa.mask(n as u64))
}

pub fn int_to_float(isa: &Isa, v: u64) -> f64 {
    isa.signed(v) as f64
}

pub fn compare_int(isa: &Isa, a: u64, b: u64) -> Flag {
    Flag::from_ordering(isa.signed(a).cmp(&isa.signed(b)))
}

/// Unordered operands (NaN) compare as greater.
pub fn compare_float(a: f64, b: f64) -> Flag {
    Flag::from_ordering(a.partial_cmp(&b).unwrap_or(Ordering::Greater))
}

fn shift_amount(isa: &Isa, amount: u64) -> Option<u32> {
    let amount = match isa.shift_mask {
        Some(bits) => amount & ((1 << bits) - 1),
        None => amount,
    };
    u32::try_from(amount).ok().filter(|&a| a < isa.word_bits)
}

pub fn shift_left(isa: &Isa, v: u64, amount: u64) -> u64 {
    shift_amount(isa, amount).map_or(0, |a| isa.mask(v << a))
}

pub fn shift_right(isa: &Isa, v: u64, amount: u64) -> u64 {
    shift_amount(isa, amount).map_or(0, |a| isa.mask(v) >> a)
}

/// Signed division and remainder; the error names the failure.
pub fn div_rem(isa: &Isa, a: u64, b: u64) -> Result<(u64, u64), &'static str> {
    let (a, b) = (isa.signed(a), isa.signed(b));
    if b == 0 {
        return Err("division by zero");
    }
    let q = a.checked_div(b).ok_or("division overflow")?;
    let r = a.checked_rem(b).ok_or("division overflow")?;
    Ok((isa.mask(q as u64), isa.mask(r as u64)))
}

/// Full signed product of two 32-bit words as `(low, high)` halves.
pub fn mul_wide(a: u64, b: u64) -> (u64, u64) {
    let p = i64::from(a as u32 as i32) * i64::from(b as u32 as i32);
    split_halves(p as u64)
}

/// Divide the signed 64-bit pair `hi:lo` by a 32-bit divisor; the quotient
/// has to fit in one word.
pub fn div_wide(lo: u64, hi: u64, divisor: u64) -> Result<(u64, u64), &'static str> {
    let dividend = join_halves(lo, hi) as i64;
    let divisor = i64::from(divisor as u32 as i32);
    if divisor == 0 {
        return Err("division by zero");
    }
    let q = dividend.checked_div(divisor).ok_or("division overflow")?;
    let r = dividend.checked_rem(divisor).ok_or("division overflow")?;
    let q = i32::try_from(q).map_err(|_| "quotient does not fit in a word")?;
    Ok((u64::from(q as u32), u64::from(r as i32 as u32)))
}
