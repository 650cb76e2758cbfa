//! HTTP API
//!
//! Routes, handlers and request middleware.

pub mod endpoints;
pub mod rate_limit;
