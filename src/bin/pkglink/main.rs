//! pkglink CLI - the link phase of an installer package toolset

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("pkglink=debug")
    } else {
        EnvFilter::new("pkglink=info")
    };

    // stdout carries linked output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .without_time()
        .init();

    let color = !cli.no_color;

    // Execute command
    match cli.command {
        Commands::Link(args) => commands::link::execute(args, color),
        Commands::Explain(args) => commands::explain::execute(args, color),
        Commands::Actions(args) => commands::actions::execute(args),
    }
}
