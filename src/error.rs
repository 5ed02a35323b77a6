use std::fmt;

#[derive(Debug)]
pub enum MetablockError {
    Config(String),
    Input(String),
    Serialization(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for MetablockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetablockError::Config(e) => write!(f, "Configuration error: {}", e),
            MetablockError::Input(e) => write!(f, "Input error: {}", e),
            MetablockError::Serialization(e) => write!(f, "Serialization error: {}", e),
            MetablockError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for MetablockError {}

impl From<serde_json::Error> for MetablockError {
    fn from(err: serde_json::Error) -> Self {
        MetablockError::Serialization(err)
    }
}

impl From<std::io::Error> for MetablockError {
    fn from(err: std::io::Error) -> Self {
        MetablockError::Io(err)
    }
}

impl From<String> for MetablockError {
    fn from(err: String) -> Self {
        MetablockError::Input(err)
    }
}
