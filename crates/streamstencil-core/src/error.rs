//! Error types for the streaming stencil engine.

use thiserror::Error;

/// Result type for stencil engine operations.
pub type Result<T> = std::result::Result<T, StencilError>;

/// Errors that can occur while configuring or running a stencil pass.
#[derive(Error, Debug)]
pub enum StencilError {
    /// Invalid dimensions, lane width, word width or kernel arity.
    ///
    /// Always reported before a pass starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A window needed data that was not buffered, or two input streams
    /// fell out of step. Aborts the pass.
    #[error("Boundary policy violation at word {word} (row {row}, col {col}): {reason}")]
    BoundaryPolicyViolation {
        /// Global index of the centre word being assembled.
        word: usize,
        /// Grid row of the offending read.
        row: isize,
        /// Grid column of the offending read.
        col: isize,
        /// What went wrong.
        reason: String,
    },

    /// Configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(String),

    /// IO error while reading or writing raw grids.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StencilError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a boundary policy violation.
    pub fn violation(word: usize, row: isize, col: isize, reason: impl Into<String>) -> Self {
        Self::BoundaryPolicyViolation {
            word,
            row,
            col,
            reason: reason.into(),
        }
    }

    /// Whether this error was raised during setup rather than mid-pass.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::ConfigParse(_))
    }
}

impl From<toml::de::Error> for StencilError {
    fn from(e: toml::de::Error) -> Self {
        StencilError::ConfigParse(e.to_string())
    }
}

impl From<toml::ser::Error> for StencilError {
    fn from(e: toml::ser::Error) -> Self {
        StencilError::ConfigParse(e.to_string())
    }
}
