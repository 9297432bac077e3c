use compact_str::CompactString;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] tap::Error),

    #[error("device at position {position} has no registered BSDL")]
    MissingBsdl { position: usize },

    #[error("device {device} has no {instruction} instruction")]
    MissingInstruction {
        device: CompactString,
        instruction: &'static str,
    },

    #[error("pin {pin} has no output boundary cell")]
    UnsupportedPin { pin: CompactString },

    #[error("corrupt BSDL: {0}")]
    CorruptBsdl(String),

    #[error("EXTEST has not been entered on this controller yet")]
    ExtestNotEntered,

    #[error("no DR has been programmed yet (call set_all_pins_hiz or drive_pin first)")]
    NoCurrentDr,
}

pub type Result<T> = std::result::Result<T, Error>;
