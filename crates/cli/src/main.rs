use clap::{Parser, Subcommand};

use wager_sim_cli::commands::{
    run_session, run_summarize, run_sweep, SessionArgs, SummarizeArgs, SweepArgs,
};

#[derive(Parser)]
#[command(name = "wager-sim")]
#[command(about = "Monte-Carlo evaluation of betting strategies", long_about = None)]
struct Cli {
    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep every policy over the win-rate grid and ROIs
    Sweep(SweepArgs),
    /// Play a single session and print its terminal state
    Session(SessionArgs),
    /// Recompute stats tables from persisted player states
    Summarize(SummarizeArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    match cli.command {
        Commands::Sweep(args) => run_sweep(args)?,
        Commands::Session(args) => run_session(args)?,
        Commands::Summarize(args) => run_summarize(args)?,
    }

    Ok(())
}
