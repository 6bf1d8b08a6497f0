//! Built-in modules registered at boot (§4.7). Exactly one is installed:
//! `core`.

pub mod core;
