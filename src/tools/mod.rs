//! Tool execution substrates.

pub mod builtin;
pub mod module;
pub mod registry;
pub mod script;
