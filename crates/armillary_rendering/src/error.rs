//! # Rendering Error Types
//!
//! Everything that can stop a rendering session from being built.
//! Once a session exists, nothing in it fails: contract violations
//! panic instead.

use thiserror::Error;

/// Errors from loading viewer configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the schema.
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed, but a value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from constructing a rendering session.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The multibody system has not finalized its bodies and joints.
    #[error("multibody topology must be realized before a renderer can be attached")]
    TopologyNotRealized,

    /// The host event loop could not be created.
    #[error("event loop creation failed: {0}")]
    EventLoop(String),

    /// The window could not be created.
    #[error("window creation failed: {0}")]
    WindowCreation(String),

    /// No drawable surface for the window.
    #[error("surface creation failed: {0}")]
    SurfaceCreation(String),

    /// No GPU adapter compatible with the surface.
    #[error("no compatible GPU adapter")]
    AdapterUnavailable,

    /// The adapter refused to hand out a device.
    #[error("device request failed: {0}")]
    DeviceRequest(String),

    /// Bad viewer configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for rendering construction.
pub type RenderResult<T> = Result<T, RenderError>;
