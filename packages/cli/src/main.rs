mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, dev, init, inspect, new_component, new_page, ApplyArgs, DevArgs, GlobalArgs, InitArgs,
    InspectArgs, NewComponentArgs, NewPageArgs,
};
use std::path::PathBuf;

/// Toolpad CLI - keep a Toolpad app in sync with its project files
#[derive(Parser, Debug)]
#[command(name = "toolpad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root (defaults to the nearest folder containing `toolpad/`)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Never write project files
    #[arg(long, global = true)]
    read_only: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Toolpad project
    Init(InitArgs),

    /// Print the application tree
    Inspect(InspectArgs),

    /// Watch the project and print change events
    Dev(DevArgs),

    /// Apply a JSON diff to the project
    Apply(ApplyArgs),

    /// Add a page
    NewPage(NewPageArgs),

    /// Add a code component
    NewComponent(NewComponentArgs),
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let global = GlobalArgs {
        dir: cli.dir,
        read_only: cli.read_only,
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &global).await,
        Command::Inspect(args) => inspect(args, &global).await,
        Command::Dev(args) => dev(args, &global).await,
        Command::Apply(args) => apply(args, &global).await,
        Command::NewPage(args) => new_page(args, &global).await,
        Command::NewComponent(args) => new_component(args, &global).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
