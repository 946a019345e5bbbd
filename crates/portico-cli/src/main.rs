//! Portico CLI - query any configured access point from the shell
//!
//! Loads a site configuration and runs one operation against it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ListCommand, OpenCommand, RemoveCommand, SaveCommand, SearchCommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Site configuration file
    #[arg(
        short,
        long,
        default_value = "site.ini",
        env = "PORTICO_CONFIG",
        global = true
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "PORTICO_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "PORTICO_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured access points
    List(ListCommand),
    /// Print every item matching a query, one JSON object per line
    Search(SearchCommand),
    /// Print the single item matching a query
    Open(OpenCommand),
    /// Create or update an item
    Save(SaveCommand),
    /// Remove the single item matching a query
    Remove(RemoveCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // If RUST_LOG is set, use it directly; otherwise use our default filter
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "portico_cli={level},\
             portico_query={level},\
             portico_query_memory={level},\
             portico_query_fs={level}",
            level = cli.log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .with_writer(std::io::stderr)
            .compact()
            .with_target(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::List(cmd) => cmd.execute(&cli.config),
        Commands::Search(cmd) => cmd.execute(&cli.config),
        Commands::Open(cmd) => cmd.execute(&cli.config),
        Commands::Save(cmd) => cmd.execute(&cli.config),
        Commands::Remove(cmd) => cmd.execute(&cli.config),
    }
}
