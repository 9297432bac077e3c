use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("adapter does not implement this capability")]
    NotImplemented,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid TAP state transition")]
    InvalidState,
}

pub type Result<T> = std::result::Result<T, Error>;
