//! Error types for the streamstencil CLI.

use streamstencil_core::StencilError;
use thiserror::Error;

/// CLI result type alias.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type.
#[derive(Error, Debug)]
pub enum CliError {
    /// IO error while reading or writing grid files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by the engine.
    #[error(transparent)]
    Engine(#[from] StencilError),

    /// Invalid command-line argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Grid file does not match the configured dimensions.
    #[error("Grid file {path}: {reason}")]
    GridFile {
        /// File that failed to load.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
}
