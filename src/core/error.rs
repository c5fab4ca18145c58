use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeferError {
    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Link error: {0}")]
    LinkError(String),

    #[error("Callback halted: {0}")]
    CallbackHalted(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, DeferError>;

impl<T> From<std::sync::PoisonError<T>> for DeferError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for DeferError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}
