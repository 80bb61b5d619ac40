//! Error types for sitesync.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sitesync.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    #[error("Unknown table group: {0}")]
    UnknownTableGroup(String),

    // Precondition errors
    #[error("Source and destination databases are the same: {0}")]
    SameDatabase(String),

    #[error("Refusing to operate through symlink: {0}")]
    SymlinkedRoot(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("{0} not found or not configured properly")]
    ToolUnavailable(String),

    // Push errors
    #[error("Failed to spawn command: {0}")]
    SpawnError(String),

    // Serialization errors
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
