use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModemError {
    #[error("capture device unavailable: {0}")]
    PermissionDenied(String),

    #[error("message cannot be encoded for transmission: {0}")]
    Encoding(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("audio backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, ModemError>;
