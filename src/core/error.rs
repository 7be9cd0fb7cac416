use std::error::Error;
use std::fmt::Display;

/// Error type for dispatcher operations
#[derive(Debug)]
pub enum DispatchError {
    /// Configuration could not be read or is inconsistent
    ConfigError(String),
    /// Run plan failed validation
    ValidationError(String),
    /// The multiplexer refused to create or drive a session
    LaunchError(String),
    /// Spawning an external process or reading a file failed
    IoError(std::io::Error),
    /// Plan or report (de)serialization failed
    SerializationError(String),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            DispatchError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            DispatchError::LaunchError(msg) => write!(f, "Launch error: {}", msg),
            DispatchError::IoError(err) => write!(f, "I/O error: {}", err),
            DispatchError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::IoError(err)
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::SerializationError(err.to_string())
    }
}
