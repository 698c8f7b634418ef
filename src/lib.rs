// Kasasagi image resizing library

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod security;
pub mod server;
pub mod transform;
