use thiserror::Error;

/// Errors raised while lexing, parsing, or extracting attributes from a
/// single BSDL source. File-path context is attached by callers (the
/// [`devicerepo`](https://docs.rs/devicerepo) loader) that know which file
/// they handed to [`crate::parse_str`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("unexpected character at line {line}, column {col}")]
    Lex { line: usize, col: usize },

    #[error("unexpected {found} at line {line}, column {col}, expected {expected}")]
    Parse {
        line: usize,
        col: usize,
        found: String,
        expected: String,
    },

    #[error("missing required attribute {0}")]
    MissingAttribute(&'static str),

    #[error("corrupt BSDL: {0}")]
    CorruptBsdl(String),
}

pub type Result<T> = std::result::Result<T, Error>;
