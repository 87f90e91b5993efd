//! Entry point for the scanpick CLI tool.

mod commands;

use std::process;

use clap::{Parser, Subcommand};
use env_logger::Env;

use commands::{convert_command, inspect_command, list_command, view_command};

#[derive(Parser)]
#[command(
    name = "scanpick",
    bin_name = "scanpick",
    version = env!("CARGO_PKG_VERSION"),
    about = "Opens a random CT scan or segmentation from an .npz archive in a viewer",
    max_term_width = 80
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = view_command::ABOUT)]
    View(view_command::ViewArgs),

    #[command(about = convert_command::ABOUT)]
    Convert(convert_command::ConvertArgs),

    #[command(about = list_command::ABOUT)]
    List(list_command::ListArgs),

    #[command(about = inspect_command::ABOUT)]
    Inspect(inspect_command::InspectArgs),
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let r = match &cli.command {
        Commands::View(args) => view_command::run(args),
        Commands::Convert(args) => convert_command::run(args),
        Commands::List(args) => list_command::run(args),
        Commands::Inspect(args) => inspect_command::run(args),
    };

    match r {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
