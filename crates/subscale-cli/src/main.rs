mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "subscale", about = "Tiled deep-zoom viewer engine for very large images")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show source dimensions, orientation and SER metadata
    Info(commands::info::InfoArgs),
    /// Print the tile pyramid built for a viewport
    Pyramid(commands::pyramid::PyramidArgs),
    /// Load an image into a headless viewport and save what it shows
    Render(commands::render::RenderArgs),
    /// Replay a pointer event script against a headless viewport
    Gestures(commands::gestures::GesturesArgs),
    /// Print or save the default engine configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Pyramid(args) => commands::pyramid::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Gestures(args) => commands::gestures::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
