//! Arena shooter - Development Tools

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_tools::validate::{
    dump_catalogs, dump_config, render_map, validate_data_directory, validate_file,
};
use arena_tools::ToolError;

#[derive(Parser)]
#[command(name = "arena-tools")]
#[command(about = "Development tools for the arena shooter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DumpTarget {
    /// Weapon, enemy and map catalogs
    Catalogs,
    /// Default balance config
    Config,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Data directory or a single RON file
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Write built-in data as RON
    Dump {
        /// What to dump
        #[arg(value_enum)]
        target: DumpTarget,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print an ASCII preview of a built-in map
    Map {
        /// Map id
        id: String,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => validate(&path),
        Commands::Dump { target, output } => dump(target, output.as_deref()),
        Commands::Map { id } => render_map(&id).map(|preview| print!("{preview}")),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn validate(path: &Path) -> Result<(), ToolError> {
    tracing::info!("Validating data files in: {}", path.display());
    if path.is_file() {
        let kind = validate_file(path)?;
        tracing::info!(?kind, "Validation passed");
        return Ok(());
    }

    let report = validate_data_directory(path)?;
    for (file, reason) in &report.failures {
        eprintln!("{}: {reason}", file.display());
    }
    if report.is_ok() {
        tracing::info!(files = report.checked.len(), "Validation passed");
        Ok(())
    } else {
        Err(ToolError::ValidationFailed {
            checked: report.checked.len(),
            failed: report.failures.len(),
        })
    }
}

fn dump(target: DumpTarget, output: Option<&Path>) -> Result<(), ToolError> {
    let text = match target {
        DumpTarget::Catalogs => dump_catalogs()?,
        DumpTarget::Config => dump_config()?,
    };
    match output {
        Some(path) => {
            std::fs::write(path, text).map_err(|source| ToolError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}
