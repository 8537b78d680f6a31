//! Unified error types for the sqdeploy workspace.
//!
//! Only fatal conditions are errors. Recoverable problems (missing refs,
//! already-mounted basenames, failed pre-link checks, reload failures) are
//! reported as [`crate::types::Warning`] values and never travel through
//! this enum.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DeployError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A YAML document could not be parsed or rendered.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Validation left no usable deployment pair.
    #[error("nothing to deploy: no valid assignments remain after validation")]
    NothingToDeploy,

    /// A container runtime operation failed.
    #[error("runtime operation `{operation}` failed: {message}")]
    Runtime {
        /// Operation that failed (e.g. `compose up`).
        operation: String,
        /// Description of the failure.
        message: String,
    },

    /// The container never reported a running state.
    #[error("container {container} was not running after {attempts} status checks")]
    ReadyTimeout {
        /// Container that was polled.
        container: String,
        /// Number of status polls performed.
        attempts: u32,
    },

    /// Creating a password-file link inside the container failed.
    #[error("failed to create link {link}: {message}")]
    LinkFailed {
        /// Link path inside the container.
        link: String,
        /// Description of the failure.
        message: String,
    },

    /// Ownership reassignment or the maintenance script failed.
    #[error("permission fixup failed: {message}")]
    PermissionFixup {
        /// Description of the failure.
        message: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DeployError>;
