//! Pure domain services: no I/O, deterministic for a given input.

mod context_assembler;
mod document_builder;
mod prompt;
mod similarity;

pub use context_assembler::*;
pub use document_builder::*;
pub use prompt::*;
pub use similarity::*;
