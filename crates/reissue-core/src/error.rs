//! Error types for reissue-core

use thiserror::Error;

/// Result type alias using reissue-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Reissue
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Home directory could not be determined
    #[error("Could not determine home directory")]
    HomeDirNotFound,

    /// Unknown disposition name
    #[error("Unknown disposition: {name}. Valid dispositions: normal, abort-retries, repair-session")]
    InvalidDisposition { name: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid disposition error
    pub fn invalid_disposition(name: impl Into<String>) -> Self {
        Self::InvalidDisposition { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = Error::invalid_config("REISSUE_LOG_LEVEL must not be blank");
        assert_eq!(
            err.to_string(),
            "Invalid configuration format: REISSUE_LOG_LEVEL must not be blank"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
