pub mod config;
pub mod http_app;
pub mod logging;
pub mod mcp;
pub mod http {
    pub mod json;
}
pub mod boot;
pub mod runtime;
