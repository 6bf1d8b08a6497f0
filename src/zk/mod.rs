//! ZooKeeper view: typed key access, topology enumeration, recursive
//! listing/delete (§4.2).

mod path;
mod view;

pub use path::resolve as resolve_path;
pub use view::{StatFields, ZkView};
