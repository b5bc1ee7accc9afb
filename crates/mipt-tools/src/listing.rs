use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use mipt_emu::decoder::{Decoder, TableDecoder};
use mipt_emu::disasm::fmt_decoded;
use mipt_emu::image::HEADER_LEN;
use mipt_emu::{Image, Profile};

/// One listed word.
#[derive(Debug, Clone, Serialize)]
pub struct Row {
    pub addr: u64,
    pub raw: u64,
    pub text: String,
    /// Sits past the header's code word count. Only exact for images
    /// that place all instructions before all data.
    pub data: bool,
}

pub fn load_image(path: &Path, profile: Profile) -> Result<Image> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(
        file.len() >= HEADER_LEN,
        "{} is shorter than the {HEADER_LEN}-byte header",
        path.display()
    );
    Ok(Image::from_bytes(profile, &file)?)
}

pub fn parse_u64(s: &str) -> Result<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u64::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u64>()?)
    }
}

/// Render the words whose addresses fall in `[start, end)`.
pub fn list(image: &Image, start: u64, end: Option<u64>) -> Vec<Row> {
    let isa = image.profile.isa();
    let dec = TableDecoder::new(isa);
    let unit = isa.unit();
    image
        .words
        .iter()
        .enumerate()
        .map(|(i, &raw)| (i as u64, i as u64 * unit, raw))
        .filter(|&(_, addr, _)| addr >= start && end.map_or(true, |e| addr < e))
        .map(|(i, addr, raw)| {
            let data = i >= image.code_words;
            let text = match dec.decode(raw) {
                Some(d) if !data => fmt_decoded(isa, addr, &d),
                _ => format!("word {raw}"),
            };
            Row {
                addr,
                raw,
                text,
                data,
            }
        })
        .collect()
}
