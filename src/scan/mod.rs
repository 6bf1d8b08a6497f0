//! Partition-parallel scan engine (C4, §4.4).

pub mod engine;
pub mod predicate;
pub mod restrictions;

pub use engine::{new_cancel_flag, CancelFlag};
pub use predicate::{Predicate, PredicateList};
pub use restrictions::KqlRestrictions;
