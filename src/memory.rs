use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::isa::{Addressing, Isa};

/// Word-granular view of simulated memory. Addresses are in the machine's
/// address unit; every access moves one whole word.
pub trait Bus {
    fn read_word(&mut self, addr: u64) -> Result<u64>;
    fn write_word(&mut self, addr: u64, val: u64) -> Result<()>;
}

#[derive(thiserror::Error, Debug)]
#[error("address {addr:#x} outside memory of {size:#x} units")]
pub struct MemoryFault {
    pub addr: u64,
    pub size: u64,
}

/// Flat zero-initialised memory backed by a byte vector. Words are stored
/// little-endian.
#[derive(Clone, Serialize, Deserialize)]
pub struct LinearMemory {
    pub mem: Vec<u8>,
    word_bytes: usize,
    /// Bytes per address unit.
    stride: usize,
}

impl LinearMemory {
    pub fn new(units: u64, word_bytes: usize, addressing: Addressing) -> Self {
        let stride = match addressing {
            Addressing::Word => word_bytes,
            Addressing::Byte => 1,
        };
        Self {
            mem: vec![0; units as usize * stride],
            word_bytes,
            stride,
        }
    }

    pub fn for_isa(isa: &Isa) -> Self {
        Self::new(isa.address_space, isa.word_bytes() as usize, isa.addressing)
    }

    /// Size in address units.
    pub fn size(&self) -> u64 {
        (self.mem.len() / self.stride) as u64
    }

    fn offset(&self, addr: u64) -> Result<usize> {
        let off = usize::try_from(addr)
            .ok()
            .and_then(|a| a.checked_mul(self.stride))
            .filter(|off| {
                off.checked_add(self.word_bytes)
                    .map_or(false, |end| end <= self.mem.len())
            });
        off.ok_or_else(|| {
            MemoryFault {
                addr,
                size: self.size(),
            }
            .into()
        })
    }

    /// Read without going through the bus; `None` when out of range.
    pub fn peek(&self, addr: u64) -> Option<u64> {
        let off = self.offset(addr).ok()?;
        Some(self.load_le(off))
    }

    fn load_le(&self, off: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf[..self.word_bytes].copy_from_slice(&self.mem[off..off + self.word_bytes]);
        u64::from_le_bytes(buf)
    }

    fn store_le(&mut self, off: usize, v: u64) {
        let n = self.word_bytes;
        self.mem[off..off + n].copy_from_slice(&v.to_le_bytes()[..n]);
    }
}

impl Bus for LinearMemory {
    fn read_word(&mut self, addr: u64) -> Result<u64> {
        let off = self.offset(addr)?;
        Ok(self.load_le(off))
    }

    fn write_word(&mut self, addr: u64, val: u64) -> Result<()> {
        let off = self.offset(addr)?;
        self.store_le(off, val);
        Ok(())
    }
}
