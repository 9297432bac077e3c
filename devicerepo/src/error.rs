use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse BSDL file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: bsdl::Error,
    },

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no registered device matches IDCODE {idcode:#010x}")]
    UnknownIdCode { idcode: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
