use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use lockledger_core::LedgerCodec;
use lockledger_server::query::matches;
use lockledger_server::{LedgerServer, ServerConfig};
use lockledger_types::LedgerEntries;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Decode(args) => cmd_decode(args, cli.format),
        Command::Config(args) => cmd_config(args, cli.format),
    }
}

/// Configuration from `path` if given, else defaults; env overrides apply either way.
fn resolve_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let config = match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ServerConfig::from_env()?,
    };
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    config.validate()?;

    let server = LedgerServer::from_config(config)?;
    println!(
        "{} Lock Ledger on {} (grace window {}s)",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold(),
        server.config().grace_window_secs
    );

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_decode(args: DecodeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let data = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let mut entries = LedgerCodec::decode(&data)
        .with_context(|| format!("decoding {}", args.file.display()))?;
    tracing::debug!(file = %args.file.display(), entries = entries.len(), "ledger decoded");
    if let Some(needle) = &args.query {
        entries.retain(|_, entry| matches(entry, needle));
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => print!("{}", render_entries(&entries)),
    }
    Ok(())
}

fn render_entries(entries: &LedgerEntries) -> String {
    if entries.is_empty() {
        return "No locked objects.\n".into();
    }
    let mut out = String::new();
    for entry in entries.values() {
        let lock = match (entry.temporary_hold, entry.expiration_date) {
            (true, _) => "held".red().bold().to_string(),
            (false, Some(expiry)) => format!("retained until {}", expiry.to_rfc3339())
                .yellow()
                .to_string(),
            (false, None) => "unlocked".dimmed().to_string(),
        };
        let _ = writeln!(out, "{}  {}", entry.name.bold(), lock);
        for (key, value) in &entry.metadata {
            let _ = writeln!(out, "    {} = {}", key.cyan(), value);
        }
    }
    let _ = writeln!(out, "\n{} locked object(s)", entries.len());
    out
}

fn cmd_config(args: ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}
