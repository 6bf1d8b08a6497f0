//! Query parser/planner (C5, §4.5): compiles a small SQL-ish `select`
//! statement into a predicate + projection + restrictions, then dispatches
//! to the scan engine (C4).

pub mod decoder;
pub mod parser;
pub mod planner;

pub use decoder::{resolve_decoder, RecordDecoder};
pub use parser::{parse, SelectStatement};
pub use planner::{run_select, SelectResult, SelectRow};
