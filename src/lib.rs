// src/lib.rs
pub mod config;
pub mod endpoints;
pub mod metrics;
pub mod probe;
pub mod server;
pub mod system;
