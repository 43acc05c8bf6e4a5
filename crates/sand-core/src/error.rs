use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
