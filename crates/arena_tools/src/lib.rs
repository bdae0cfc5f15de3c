//! # Arena Development Tools
//!
//! Command-line tools for development:
//! - Data validators for catalog and balance RON files
//! - Dumpers that write the built-in data out as RON to start new files from
//! - Map previews

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;

use std::path::PathBuf;

use arena_core::error::GameError;
use thiserror::Error;

/// Errors raised by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Reading or writing a file failed.
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The data was rejected by the core.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Encoding RON failed.
    #[error("Failed to write RON: {0}")]
    Encode(#[from] ron::Error),

    /// One or more files failed validation.
    #[error("{failed} of {checked} data files failed validation")]
    ValidationFailed {
        /// Files checked.
        checked: usize,
        /// Files with problems.
        failed: usize,
    },
}

/// Result alias for the tools.
pub type Result<T> = std::result::Result<T, ToolError>;
