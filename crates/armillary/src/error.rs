//! Driver errors.

use armillary_rendering::{ConfigError, RenderError};
use thiserror::Error;

/// Anything that stops the demonstration before or during the run.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The renderer could not be built
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The viewer configuration could not be read
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command-line argument was not understood
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The coupling constraint could not be satisfied at initialization
    #[error("assembly failed, constraint residual {residual:e}")]
    AssemblyFailed {
        /// Remaining constraint error
        residual: f64,
    },
}

/// Result alias for the driver.
pub type DriverResult<T> = Result<T, DriverError>;
