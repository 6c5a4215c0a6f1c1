use clap::Parser;
use std::path::PathBuf;

/// Command-line front end: extract one statement and print the result.
#[derive(Debug, Clone, Parser)]
#[command(name = "statement-extract")]
#[command(about = "Extract account details and transactions from a bank statement PDF")]
pub struct CliArgs {
    /// Bank statement PDF to process
    pub file: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the transactions table as CSV when one is found
    #[arg(long)]
    pub csv_out: Option<PathBuf>,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

/// HTTP API server.
#[derive(Debug, Clone, Parser)]
#[command(name = "statement-server")]
#[command(about = "Bank statement extraction HTTP API")]
pub struct ServerArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the bind address from the configuration
    #[arg(long)]
    pub bind: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}
