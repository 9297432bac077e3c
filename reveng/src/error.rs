use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("boundary-scan runtime error: {0}")]
    Bsr(#[from] bsr::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("reverse-engineering run cancelled")]
    Cancelled,
}

/// Not a blanket `#[from]`: the message names the config field at fault,
/// which `regex::Error`'s own `Display` doesn't know about.
impl From<regex::Error> for Error {
    fn from(source: regex::Error) -> Self {
        Error::InvalidConfig(format!("OnlyPinPattern is not a valid regex: {source}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
