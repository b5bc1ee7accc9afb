use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use mipt_emu::{assemble, Profile};

#[derive(Parser, Debug)]
#[command(author, version, about = "MIPT32/MIPT64 assembler")]
struct Opts {
    /// Input assembly file (one instruction or directive per line)
    #[arg(short, long)]
    input: PathBuf,
    /// Output image file
    #[arg(short, long)]
    output: PathBuf,
    /// Machine profile
    #[arg(short, long, value_enum, default_value_t = Profile::Mipt32)]
    profile: Profile,
    /// Also write the label table as JSON
    #[arg(long, value_name = "FILE")]
    labels_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let text = fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let image = assemble(opts.profile, &text)
        .with_context(|| format!("assembling {}", opts.input.display()))?;
    fs::write(&opts.output, image.to_bytes()?)?;
    if let Some(path) = &opts.labels_out {
        fs::write(path, serde_json::to_string_pretty(&image.labels)?)?;
    }
    eprintln!(
        "{}: {} code + {} data words, entry {:#x}",
        opts.output.display(),
        image.code_words,
        image.data_words,
        image.entry
    );
    Ok(())
}
