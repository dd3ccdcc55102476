// Core
mod opcode;
pub use opcode::{Opcode, UnknownMnemonic, Word, MAX_VALUE};
mod unit;
pub use unit::{AsmUnit, CodeOffs, MemoryImage, MEMORY_SIZE};
mod error;
pub use error::AsmError;

// Parsing
mod lexer;
mod parser;
pub use parser::AsmParser;
mod span;

// Emitting
pub mod output;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;

/// Assemble JohnnyScript source into a complete memory image.
pub fn assemble(src: &str) -> miette::Result<MemoryImage> {
    AsmParser::new(src).parse()
}
