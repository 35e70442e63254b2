use anyhow::Result;
use clap::{Parser, Subcommand};
use seedscan::engine;

#[derive(Parser)]
#[command(name = "seedscan")]
#[command(version = "0.1.0")]
#[command(about = "Lookup-table word finder for nucleotide sequence search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find exact-match word seeds between a query and subjects
    Scan(engine::ScanArgs),

    /// Find PROSITE-style pattern matches in sequences
    Phi(engine::PhiArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            engine::run_scan(args)?;
        }
        Commands::Phi(args) => {
            engine::run_phi(args)?;
        }
    }
    Ok(())
}
