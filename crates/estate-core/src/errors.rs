use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstateError {
    #[error("listing not found")]
    NotFound,
    #[error("unknown property type group: {0}")]
    UnknownGroup(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EstateError>;
