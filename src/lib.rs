pub mod api;
pub mod bridge;
pub mod cli;
pub mod core;
pub mod discovery;
pub mod domain;
pub mod infra;
pub mod registry;
pub mod schema;
pub mod template;
pub mod tools;
