//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A required secret was not found through any resolution method.
    #[error("{name} not set. Set the {env_var} env var or add it to the config file")]
    MissingSecret { name: String, env_var: String },

    /// The cookie signing secret is too short to derive a key from.
    #[error("cookie secret must be at least {min} bytes (got {len})")]
    WeakCookieSecret { len: usize, min: usize },

    /// A value could not be interpreted.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}
