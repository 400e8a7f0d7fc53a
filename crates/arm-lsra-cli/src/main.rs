mod parse;

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "arm-lsra")]
#[command(about = "Linear-scan register allocator for an ARM-like machine IR")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate registers in a machine-IR listing
    Alloc {
        #[arg(help = "Input listing")]
        input: PathBuf,

        #[arg(short, long, help = "Output listing (stdout when omitted)")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Alloc { input, output } => {
            let src = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let mut unit = parse::parse_unit(&src)
                .with_context(|| format!("Failed to parse {}", input.display()))?;

            arm_lsra::allocate(&mut unit).context("Register allocation failed")?;

            let mut listing = String::new();
            for (i, func) in unit.funcs().iter().enumerate() {
                if i > 0 {
                    listing.push('\n');
                }
                let _ = write!(listing, "{func}");
            }

            match output {
                Some(path) => {
                    fs::write(&path, &listing)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "Allocated {} -> {} ({} functions)",
                        input.display(),
                        path.display(),
                        unit.funcs().len()
                    );
                }
                None => print!("{listing}"),
            }
        }
    }

    Ok(())
}
