//! # vellum
//!
//! Command-line front end of the Vellum SFC compiler: prints the block
//! descriptor of a `.vue` file or compiles its template and style blocks.
//!
//! Logging goes to stderr and is filtered by the `VELLUM_LOG` environment
//! variable (e.g. `VELLUM_LOG=debug`).

mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vellum")]
#[command(about = "Vue single file component compiler in Rust", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Print version
    #[arg(short = 'v', short_alias = 'V', long, action = clap::ArgAction::Version)]
    version: (),
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the block descriptor of a .vue file
    Parse(commands::parse::ParseArgs),

    /// Compile the template block
    #[command(visible_alias = "t")]
    Template(commands::template::TemplateArgs),

    /// Compile the style blocks
    #[command(visible_alias = "s")]
    Style(commands::style::StyleArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("VELLUM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let config = config::load_config(None);

    match cli.command {
        Commands::Parse(args) => commands::parse::run(args, &config),
        Commands::Template(args) => commands::template::run(args, &config),
        Commands::Style(args) => commands::style::run(args, &config),
    }
}
