//! API data models
//!
//! This module contains data structures for the proxy's own API and for the
//! generative language API.

pub mod gemini;
pub mod proxy;
