use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mipt_emu::{assemble, Emulator, Image, MachineConfig, Profile, StreamConsole};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Assemble and run a MIPT32/MIPT64 program against stdin/stdout"
)]
struct Opts {
    /// Machine profile
    #[arg(short, long, value_enum, default_value_t = Profile::Mipt32)]
    profile: Profile,
    /// Treat FILE as a pre-assembled image instead of assembly source
    #[arg(long)]
    bin: bool,
    /// Override the entry address
    #[arg(short, long)]
    entry: Option<u64>,
    /// Machine configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Abort after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,
    /// Skip unknown syscall codes instead of trapping
    #[arg(long)]
    lenient_syscalls: bool,
    /// Print the final machine state as JSON on stderr
    #[arg(long)]
    dump_state: bool,
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn load_config(opts: &Opts) -> Result<MachineConfig> {
    let mut cfg = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => MachineConfig::default(),
    };
    if opts.max_steps.is_some() {
        cfg.step_limit = opts.max_steps;
    }
    if opts.lenient_syscalls {
        cfg.strict_syscalls = false;
    }
    Ok(cfg)
}

fn load_image(opts: &Opts) -> Result<Image> {
    let mut image = if opts.bin {
        let bytes = std::fs::read(&opts.input)
            .with_context(|| format!("reading {}", opts.input.display()))?;
        Image::from_bytes(opts.profile, &bytes)?
    } else {
        let src = std::fs::read_to_string(&opts.input)
            .with_context(|| format!("reading {}", opts.input.display()))?;
        assemble(opts.profile, &src)
            .with_context(|| format!("assembling {}", opts.input.display()))?
    };
    if let Some(entry) = opts.entry {
        image.entry = entry;
    }
    Ok(image)
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let cfg = load_config(&opts)?;
    let image = load_image(&opts)?;
    debug!(words = image.words.len(), entry = image.entry, "image ready");

    let mut emu = Emulator::new(&image, cfg, StreamConsole::stdio())?;
    let outcome = emu.run();

    if opts.dump_state {
        eprintln!("{}", serde_json::to_string_pretty(&emu.machine)?);
    }

    match outcome {
        Ok(status) => Ok(ExitCode::from(status as u8)),
        Err(trap) => {
            eprintln!("TRAP: {trap}");
            Ok(ExitCode::FAILURE)
        }
    }
}
