use serde::{Deserialize, Serialize};

use crate::asm::LabelTable;
use crate::isa::Profile;
use crate::memory::{Bus, LinearMemory};

/// Little-endian header: code word count at byte 16, data word count at
/// byte 20, entry address at byte 28. The payload follows.
pub const HEADER_LEN: usize = 512;
const CODE_COUNT_AT: usize = 16;
const DATA_COUNT_AT: usize = 20;
const ENTRY_AT: usize = 28;

#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    #[error("image truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("image of {words} words exceeds memory of {capacity} words")]
    TooLarge { words: u64, capacity: u64 },
    #[error("{what} {value} does not fit the 32-bit header field")]
    HeaderOverflow { what: &'static str, value: u64 },
    #[error("loading image: {0}")]
    Load(#[source] anyhow::Error),
}

/// Assembled program: memory contents starting at address 0 plus entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub profile: Profile,
    pub words: Vec<u64>,
    pub entry: u64,
    pub code_words: u64,
    pub data_words: u64,
    pub labels: LabelTable,
}

fn put_u32(buf: &mut [u8], at: usize, what: &'static str, value: u64) -> Result<(), ImageError> {
    let v = u32::try_from(value).map_err(|_| ImageError::HeaderOverflow { what, value })?;
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
    Ok(())
}

fn get_u32(bytes: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&bytes[at..at + 4]);
    u64::from(u32::from_le_bytes(b))
}

impl Image {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        let wb = self.profile.isa().word_bytes() as usize;
        let mut out = vec![0u8; HEADER_LEN];
        put_u32(&mut out, CODE_COUNT_AT, "code word count", self.code_words)?;
        put_u32(&mut out, DATA_COUNT_AT, "data word count", self.data_words)?;
        put_u32(&mut out, ENTRY_AT, "entry address", self.entry)?;
        for w in &self.words {
            out.extend_from_slice(&w.to_le_bytes()[..wb]);
        }
        Ok(out)
    }

    pub fn from_bytes(profile: Profile, bytes: &[u8]) -> Result<Image, ImageError> {
        let isa = profile.isa();
        if bytes.len() < HEADER_LEN {
            return Err(ImageError::Truncated {
                needed: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let code_words = get_u32(bytes, CODE_COUNT_AT);
        let data_words = get_u32(bytes, DATA_COUNT_AT);
        let entry = get_u32(bytes, ENTRY_AT);

        let total = code_words + data_words;
        let capacity = isa.address_space / isa.unit();
        if total > capacity {
            return Err(ImageError::TooLarge {
                words: total,
                capacity,
            });
        }
        let wb = isa.word_bytes() as usize;
        let needed = HEADER_LEN + total as usize * wb;
        if bytes.len() < needed {
            return Err(ImageError::Truncated {
                needed,
                actual: bytes.len(),
            });
        }

        let words = bytes[HEADER_LEN..needed]
            .chunks_exact(wb)
            .map(|c| {
                let mut b = [0u8; 8];
                b[..wb].copy_from_slice(c);
                u64::from_le_bytes(b)
            })
            .collect();

        Ok(Image {
            profile,
            words,
            entry,
            code_words,
            data_words,
            labels: LabelTable::new(),
        })
    }

    /// Copy the words to memory starting at address 0.
    pub fn load_into(&self, mem: &mut LinearMemory) -> Result<(), ImageError> {
        let unit = self.profile.isa().unit();
        for (i, &w) in self.words.iter().enumerate() {
            mem.write_word(i as u64 * unit, w).map_err(ImageError::Load)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn header_fields_sit_at_fixed_offsets() {
        let img = Image {
            profile: Profile::Mipt32,
            words: vec![0x0100_0000, 7, 9],
            entry: 2,
            code_words: 1,
            data_words: 2,
            labels: LabelTable::new(),
        };
        let bytes = img.to_bytes().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 12);
        assert_eq!(&bytes[16..20], &1u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &2u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &2u32.to_le_bytes());
        assert_eq!(&bytes[HEADER_LEN..HEADER_LEN + 4], &[0, 0, 0, 1]);
    }

    #[test]
    fn truncated_payload_is_reported() {
        let mut bytes = vec![0u8; HEADER_LEN + 8];
        bytes[16] = 2;
        let err = Image::from_bytes(Profile::Mipt64, &bytes).unwrap_err();
        assert!(matches!(err, ImageError::Truncated { needed: 528, actual: 520 }));
    }
}
