//! Error types surfaced by the registry and configuration layers.

use thiserror::Error;

use crate::config::ConfigError;

/// Boxed error returned by authentication strategies and pool capabilities.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PacerError>;

/// Errors surfaced to the calling execution.
#[derive(Debug, Error)]
pub enum PacerError {
    /// Building the physical pool failed. The key is left absent so a later call can retry.
    #[error("failed to build pool {pool_name}: {source}")]
    PoolConstruction {
        /// Name the pool would have been published under.
        pool_name: String,
        /// Failure reported by the authentication strategy.
        #[source]
        source: BoxError,
    },
    /// The pool exists but handing out a connection failed.
    #[error("failed to acquire connection from pool {pool_name}: {source}")]
    ConnectionAcquisition {
        /// Pool the handout was attempted against.
        pool_name: String,
        /// Failure reported by the authentication strategy.
        #[source]
        source: BoxError,
    },
    /// A configuration value or runtime setting was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Startup configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Diagnostics could not be rendered.
    #[error("failed to serialize statistics: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The registry was closed and no longer hands out connections.
    #[error("connection pool registry is closed")]
    RegistryClosed,
}

impl PacerError {
    /// Name of the pool involved in the failure, when there is one.
    pub fn pool_name(&self) -> Option<&str> {
        match self {
            PacerError::PoolConstruction { pool_name, .. }
            | PacerError::ConnectionAcquisition { pool_name, .. } => Some(pool_name),
            PacerError::InvalidConfig(_)
            | PacerError::Config(_)
            | PacerError::Serialization(_)
            | PacerError::RegistryClosed => None,
        }
    }
}
