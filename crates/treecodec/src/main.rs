use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use treecodec::commands::{CheckOutcome, run_check, run_normalize, run_schema};
use treecodec::logging::init_tracing;
use treecodec::session::Session;

/// treecodec - check and normalize JSON documents against declared types
#[derive(Parser)]
#[command(name = "treecodec")]
#[command(about = "Descriptor-driven JSON conversion tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: treecodec.toml or treecodec.json found upward from the
    /// working directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Additional type library file or directory (repeatable)
    #[arg(short = 'L', long = "library", global = true)]
    libraries: Vec<PathBuf>,

    /// Log filter, e.g. "debug" or "treecodec_core=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Override the deserializer nesting limit
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Subcommand)]
enum Commands {
    /// Print the field-type shape of a type
    Schema {
        /// Type expression, e.g. "Employee" or "Sequence[Name]"
        #[arg(value_name = "TYPE")]
        type_name: String,
    },
    /// Check that a JSON document deserializes as a type
    Check {
        /// Type expression
        #[arg(value_name = "TYPE")]
        type_name: String,
        /// Input document (stdin when omitted or "-")
        input: Option<PathBuf>,
    },
    /// Deserialize then re-serialize a JSON document, printing the canonical form
    Normalize {
        /// Type expression
        #[arg(value_name = "TYPE")]
        type_name: String,
        /// Input document (stdin when omitted or "-")
        input: Option<PathBuf>,
        /// Keep null-valued fields in the output
        #[arg(long)]
        keep_nulls: bool,
    },
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = Session::load_config(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.log_json;
    if let Some(max_depth) = cli.max_depth {
        config.codec.max_depth = max_depth;
    }
    init_tracing(&config.logging.level, config.logging.json)?;

    let session = Session::open(config, &cli.libraries)?;
    match &cli.command {
        Commands::Schema { type_name } => run_schema(&session, type_name)?,
        Commands::Check { type_name, input } => {
            if let CheckOutcome::Invalid(_) = run_check(&session, type_name, input.as_deref())? {
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Normalize {
            type_name,
            input,
            keep_nulls,
        } => run_normalize(&session, type_name, input.as_deref(), *keep_nulls)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
