use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lockledger",
    about = "Lock Ledger: an index of held and retained objects per container",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Decode and print a ledger object file
    Decode(DecodeArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Address to listen on, overriding the configuration
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// JSON seed file for the in-memory store
    #[arg(long)]
    pub seed: Option<PathBuf>,
}

#[derive(Args)]
pub struct DecodeArgs {
    /// Ledger object file (`<container>_locked_objects.json`)
    pub file: PathBuf,
    /// Only show entries whose name or metadata contains this text
    #[arg(short, long)]
    pub query: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
