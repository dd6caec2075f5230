mod commands;
mod script;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{replay, show, ReplayArgs, ShowArgs};
use tracing_subscriber::EnvFilter;

/// DADM properties editor - replay editing sessions against a process document
#[derive(Parser, Debug)]
#[command(name = "dadm-props")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an editing script against a document
    Replay(ReplayArgs),

    /// Print a document in its serialized form
    Show(ShowArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Replay(args) => replay(args).await,
        Command::Show(args) => show(args),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
