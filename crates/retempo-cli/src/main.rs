//! Retempo CLI - change the tempo, pitch and playback rate of WAV files.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retempo")]
#[command(author, version, about = "Tempo, pitch and rate changer for WAV files", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Change tempo, pitch and/or rate of a WAV file
    Process(commands::process::ProcessArgs),

    /// Generate a stereo sine test tone
    Generate(commands::generate::GenerateArgs),

    /// Measure duration, level and dominant frequency
    Analyze(commands::analyze::AnalyzeArgs),

    /// Show WAV file information
    Info(commands::info::InfoArgs),

    /// List factory and user presets, or print one
    Presets(commands::presets::PresetsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    match cli.command {
        Commands::Process(args) => commands::process::run(args),
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Presets(args) => commands::presets::run(args),
    }
}
