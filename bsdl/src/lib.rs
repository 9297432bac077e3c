//! Lexer, parser and attribute extractor for IEEE 1149.1 BSDL files.
//!
//! [`parse_str`] runs the full pipeline (lex -> parse -> extract) and
//! returns an [`attrs::ExtractedDevice`] ready for [`devicerepo`](https://docs.rs/devicerepo)
//! to index.

pub mod ast;
pub mod attrs;
pub mod error;
mod grammar;
pub mod idcode;
mod lexer;

pub use attrs::ExtractedDevice;
pub use error::{Error, Result};
pub use grammar::parse_entity as parse_entity_ast;
pub use lexer::{LineIndex, Tok};

/// Parses a complete BSDL source string and extracts its device model.
pub fn parse_str(src: &str) -> Result<ExtractedDevice> {
    let entity = grammar::parse_entity(src.as_bytes())?;
    attrs::extract(&entity)
}
