//! Hansards published from 1994 to 2005 as hand-edited HTML.
mod parser;

pub use parser::ArchiveParser;
