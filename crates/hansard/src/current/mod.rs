//! Hansards published from 2006 onwards through Publication.aspx.
mod parser;

pub use parser::CurrentParser;
