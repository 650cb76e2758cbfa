//! Core application modules
//!
//! This module contains configuration, constants, logging, the upstream
//! client, and the gateway with its retry policy and rate limiter.

pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod provider;
pub mod providers;
pub mod rate_limiter;
pub mod retry;
