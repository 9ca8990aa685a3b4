mod commands;
mod logging;
mod reader;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::generate::GenerateArgs;

#[derive(Parser)]
#[command(
    name = "schemock",
    version,
    about = "schemock: build schemas from ORM model definitions and generate test mocks"
)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a mock for every model
    Generate {
        /// Model file or directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Write one file per mock into this directory instead of stdout
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Suffix appended to generated type names
        #[arg(long)]
        suffix: Option<String>,

        /// Template file (defaults to the built-in mock template)
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Assemble all models and output the schema as JSON
    Schema {
        /// Model file or directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show what introspection sees for one model
    Inspect {
        /// Model name, relative to the model directory, without extension
        model: String,

        /// Project or model directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Output format: human (default) or json
        #[arg(long, default_value = "human")]
        format: String,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level);

    let result = match &cli.command {
        Commands::Generate {
            path,
            output_dir,
            suffix,
            template,
        } => commands::generate::run_generate(&GenerateArgs {
            path,
            output_dir: output_dir.as_deref(),
            suffix: suffix.as_deref(),
            template: template.as_deref(),
        }),
        Commands::Schema { path, output } => {
            commands::schema::run_schema(path, output.as_deref())
        }
        Commands::Inspect { model, dir, format } => {
            commands::inspect::run_inspect(model, dir, format)
        }
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}
