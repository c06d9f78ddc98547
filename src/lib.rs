//! Relay - Pooled Reverse Proxy
//!
//! Core library for origin-keyed proxy handler pooling and request
//! forwarding.

pub mod config;
pub mod proxy;
pub mod server;
