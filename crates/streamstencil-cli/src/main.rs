//! streamstencil CLI - Run streaming stencil passes and inspect kernels.
//!
//! # Commands
//!
//! - `streamstencil run` - Run chained passes over a grid
//! - `streamstencil kernels` - List kernels, taps and buffering
//! - `streamstencil completions <shell>` - Generate shell completions
//!
//! # Examples
//!
//! ```bash
//! # Eight passes of the four-point sum over a synthetic 1024x1024 ramp
//! streamstencil run --rows 1024 --cols 1024 -k sum4 -n 8
//!
//! # Coupled kernel from a config file, result written as raw f32
//! streamstencil run -c engine.toml -i a.f32 --companion b.f32 -o out.f32
//!
//! # Buffer sizing for 16-lane words over 1000-column rows
//! streamstencil kernels --lanes 16 --cols 1008 --detailed
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::{kernels, run};

/// streamstencil - streaming fixed-stencil engine
#[derive(Parser)]
#[command(name = "streamstencil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run chained stencil passes over a grid
    Run(run::RunArgs),

    /// List kernels with their taps and buffering
    Kernels {
        /// Lanes per transport word
        #[arg(short, long, default_value = "16")]
        lanes: usize,

        /// Row width used for buffer sizing
        #[arg(long, default_value = "1024")]
        cols: usize,

        /// Show per-row tap spans
        #[arg(long)]
        detailed: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => run::execute(&args),

        Commands::Kernels {
            lanes,
            cols,
            detailed,
        } => kernels::execute(lanes, cols, detailed),

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "streamstencil",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
