//! HTTP server front end
//!
//! Accepts client connections and forwards every request through the
//! shared proxy registry.

pub mod listener;

pub use listener::{run, serve};
