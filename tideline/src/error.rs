use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("Data unavailable from {source_name}: {message}")]
    DataUnavailable {
        source_name: String,
        message: String,
    },

    #[error("Viewer not found: {0}")]
    ViewerNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FeedError>;
