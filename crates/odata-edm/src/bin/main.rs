//! EDM command-line interface

use clap::{Parser, Subcommand};
use odata_edm::EdmVersion;
use odata_edm::cli::{evaluate, output, roundtrip, validate};
use std::path::PathBuf;

/// EDM command-line tool
#[derive(Parser)]
#[command(name = "edm")]
#[command(author, version, about = "OData Entity Data Model tools", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate CSDL or Edmx documents
    Validate {
        /// Documents to validate
        files: Vec<PathBuf>,

        /// Validate under the rules of this version (4.0, 4.01)
        #[arg(short = 'V', long = "edm-version")]
        version: Option<EdmVersion>,
    },

    /// Read a document and write it back as Edmx
    Roundtrip {
        /// Document to read
        file: PathBuf,

        /// Write without indentation
        #[arg(short, long)]
        compact: bool,

        /// Write this Edmx version instead of the document's own
        #[arg(short = 'V', long = "edm-version")]
        version: Option<EdmVersion>,
    },

    /// Evaluate an annotation that needs no context value
    Evaluate {
        /// Document declaring the annotation
        file: PathBuf,

        /// Qualified term name
        #[arg(short, long)]
        term: String,

        /// Annotation target path
        #[arg(short = 'T', long)]
        target: String,

        /// Annotation qualifier
        #[arg(short, long)]
        qualifier: Option<String>,
    },
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    let result = match cli.command {
        Commands::Validate { files, version } => validate::validate(validate::ValidateConfig {
            files,
            version,
            verbose: cli.verbose,
        })
        .map(|_| ()),

        Commands::Roundtrip { file, compact, version } => roundtrip::roundtrip(roundtrip::RoundTripConfig {
            file,
            output_file: cli.output.clone(),
            compact,
            version,
        }),

        Commands::Evaluate {
            file,
            term,
            target,
            qualifier,
        } => evaluate::evaluate(evaluate::EvaluateConfig {
            file,
            term,
            target,
            qualifier,
            output_file: cli.output.clone(),
        })
        .map(|_| ()),
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
