//! Apexflow CLI - command-line interface for Apexflow
//!
//! Ingests AST files produced by an Apex parser, reports compile-style
//! diagnostics, and runs path discovery and walks over the resulting graph.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "apexflow")]
#[command(author = "Apexflow Contributors")]
#[command(version)]
#[command(about = "Path-based static analysis for Apex", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root holding the .apexflow directory
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Init,

    /// Build the graph from AST JSON files
    Index {
        /// AST files of user code
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// AST files of library code (marked as standard)
        #[arg(short, long)]
        library: Vec<PathBuf>,

        /// Also export the graph as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the paths of a method
    Paths {
        /// Method as Class.method
        method: String,
    },

    /// Walk entry methods and summarize what was visited
    Walk {
        /// Method as Class.method (defaults to every user method)
        method: Option<String>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Export the stored graph to JSON
    Export {
        /// Output file
        #[arg(short, long, default_value = "apexflow-graph.json")]
        output: PathBuf,
    },

    /// Show graph statistics and stored diagnostics
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let root = cli.root;
    let result = match cli.command {
        Commands::Init => commands::init(&root),
        Commands::Index {
            files,
            library,
            output,
        } => commands::index(&root, &files, &library, output.as_deref()),
        Commands::Paths { method } => commands::paths(&root, &method),
        Commands::Walk { method, json } => commands::walk(&root, method.as_deref(), json).await,
        Commands::Export { output } => commands::export(&root, &output),
        Commands::Status => commands::status(&root),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
