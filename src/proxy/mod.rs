//! Reverse proxy functionality
//!
//! This module implements the pooled proxy core: per-origin handlers,
//! the registry that shares them, and the options controlling both.

pub mod handler;
pub mod options;
pub mod registry;

pub use handler::{empty_body, full_body, ProxyBody, ProxyHandler};
pub use options::{
    ForwardOptions, ProxyOptions, RequestHeaderRewrite, RequestOptions, ResponseHeaderRewrite,
    ResponseObserver,
};
pub use registry::ProxyRegistry;
