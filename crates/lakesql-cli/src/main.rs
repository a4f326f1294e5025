//! lakesql CLI
//!
//! Dry-run front end: compiles operations described in JSON files to SQL and
//! prints the result. It never connects to a database.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use lakesql_core::selector::BackendKind;
use lakesql_core::validate::{validate_expression, validate_identifier, FragmentKind};
use lakesql_core::{DialectConfig, Operation};

/// Validated SQL generation for lakehouse warehouses.
#[derive(Parser)]
#[command(name = "lakesql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an operation and print the SQL.
    Compile {
        /// Configuration descriptor (JSON).
        #[arg(short, long, env = "LAKESQL_CONFIG")]
        config: PathBuf,

        /// Operation to compile (JSON).
        #[arg(short, long)]
        operation: PathBuf,
    },

    /// Validate a single identifier or expression.
    Check {
        /// Value to validate.
        value: String,

        /// What the value names.
        #[arg(short, long, value_enum, default_value_t = KindArg::Table)]
        kind: KindArg,

        /// Validate as an expression instead of an identifier.
        #[arg(short, long)]
        expression: bool,
    },

    /// List the accepted backend types.
    Backends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Schema,
    Table,
    View,
    Column,
    Principal,
}

impl From<KindArg> for FragmentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Schema => Self::Schema,
            KindArg::Table => Self::Table,
            KindArg::View => Self::View,
            KindArg::Column => Self::Column,
            KindArg::Principal => Self::Principal,
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {what} file {}", path.display()))
}

fn run(command: &Commands, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Commands::Compile { config, operation } => {
            let config: DialectConfig = read_json(config, "configuration")?;
            let operation: Operation = read_json(operation, "operation")?;
            debug!(backend = %config.backend_type, operation = %operation.kind(), "compiling");
            let sql = lakesql_core::compile(&operation, &config)?;
            writeln!(out, "{sql}")?;
        }
        Commands::Check {
            value,
            kind,
            expression,
        } => {
            let sanitized = if *expression {
                validate_expression(value, FragmentKind::Expression)?
            } else {
                validate_identifier(value, (*kind).into())?
            };
            writeln!(out, "{sanitized}")?;
        }
        Commands::Backends => {
            for backend in BackendKind::ALL {
                writeln!(out, "{backend} (aliases: {})", backend.aliases().join(", "))?;
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    run(&cli.command, &mut io::stdout().lock())
}
