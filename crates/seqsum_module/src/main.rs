use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Write the bundled computation module to disk.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Output path of the binary module.
    #[arg(short, long, default_value = "sum.wasm")]
    output: PathBuf,

    /// Print the text form to stdout instead of writing a binary.
    #[arg(long)]
    wat: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.wat {
        print!("{}", seqsum_module::WAT);
        return Ok(());
    }

    seqsum_module::save(&cli.output)?;
    eprintln!("wrote {}", cli.output.display());
    Ok(())
}
