use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::PathBuf;

use mipt_emu::Profile;
use mipt_tools::{list, load_image, parse_u64};

#[derive(Parser, Debug)]
#[command(author, version, about = "MIPT image lister", long_about = None)]
struct Cli {
    /// Machine profile the image was assembled for
    #[arg(short, long, value_enum, default_value_t = Profile::Mipt32)]
    profile: Profile,
    /// Input image path
    #[arg(value_name = "IMAGE")]
    input: PathBuf,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the header fields
    Header,
    /// Disassemble the words in [start, end)
    ///
    /// The header only records word counts, so the first `code words`
    /// words are listed as instructions and the rest as data. Images whose
    /// data sits between instructions list by position.
    List {
        /// Start address (hex or dec)
        #[arg(long, default_value = "0")]
        start: String,
        /// End address (hex or dec, exclusive)
        #[arg(long)]
        end: Option<String>,
        /// Show the raw word next to each line
        #[arg(long)]
        show_bytes: bool,
        /// Output format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let img = load_image(&cli.input, cli.profile)?;

    match cli.cmd {
        Command::Header => {
            println!("{:<12} {}", "profile", img.profile);
            println!("{:<12} {}", "code words", img.code_words);
            println!("{:<12} {}", "data words", img.data_words);
            println!("{:<12} {:#x}", "entry", img.entry);
        }
        Command::List {
            start,
            end,
            show_bytes,
            format,
            out,
        } => {
            let start = parse_u64(&start)?;
            let end = end.as_deref().map(parse_u64).transpose()?;
            if let Some(end) = end {
                anyhow::ensure!(end >= start, "end must be >= start");
            }
            let rows = list(&img, start, end);
            let width = img.profile.isa().word_bytes() as usize * 2;

            let buf = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&rows)? + "\n",
                OutputFormat::Text => {
                    let mut buf = String::new();
                    for r in &rows {
                        let marker = if r.addr == img.entry { ">" } else { " " };
                        if show_bytes {
                            writeln!(
                                buf,
                                "{marker}{:#08x}: {:0width$x}  {}",
                                r.addr, r.raw, r.text
                            )?;
                        } else {
                            writeln!(buf, "{marker}{:#08x}: {}", r.addr, r.text)?;
                        }
                    }
                    buf
                }
            };
            if let Some(path) = out {
                std::fs::write(path, buf)?;
            } else {
                print!("{buf}");
            }
        }
    }
    Ok(())
}
