//! qclass Command-Line Interface
//!
//! Converts quantum expressions between circuit, matrix and Dirac notation
//! and renders the result as an image.
//!
//! ```text
//! qclass convert --from circuit --to matrix --input bell.py
//! qclass synth --from matrix --to circuit --expression "[[0, 1], [1, 0]]"
//! qclass edges --json
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::RequestArgs;
use commands::convert::ConfigOverrides;
use commands::{convert, edges, synth, version};

/// qclass - quantum expression converter
#[derive(Parser)]
#[command(name = "qclass")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to ~/.qclass/config.yaml)
    #[arg(short, long, global = true, env = "QCLASS_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an expression and render the result as an image
    Convert {
        #[command(flatten)]
        request: RequestArgs,

        /// Copy the result image here instead of leaving it in the work directory
        #[arg(short, long)]
        output: Option<String>,

        /// Python interpreter running the generated program
        #[arg(long)]
        python: Option<String>,

        /// Execution timeout in seconds (0 disables it)
        #[arg(long)]
        timeout: Option<u64>,

        /// Resolution of rendered markup
        #[arg(long)]
        dpi: Option<u32>,

        /// Render markup with mathtext instead of LaTeX
        #[arg(long)]
        no_tex: bool,
    },

    /// Print the program a conversion would run
    Synth {
        #[command(flatten)]
        request: RequestArgs,

        /// Program path the generated code refers to
        #[arg(long)]
        program: Option<String>,
    },

    /// List the supported conversions
    Edges {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Convert {
            request,
            output,
            python,
            timeout,
            dpi,
            no_tex,
        } => {
            let overrides = ConfigOverrides {
                python,
                timeout,
                dpi,
                no_tex,
            };
            convert::execute(cli.config.as_deref(), &request, &overrides, output.as_deref()).await
        }

        Commands::Synth { request, program } => {
            synth::execute(cli.config.as_deref(), &request, program.as_deref())
        }

        Commands::Edges { json } => edges::execute(json),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
