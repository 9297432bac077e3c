use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] tap::Error),

    #[error("device repository error: {0}")]
    Repo(#[from] devicerepo::Error),

    #[error("expected_count must be > 0")]
    ZeroExpectedCount,
}

pub type Result<T> = std::result::Result<T, Error>;
