//! Common utilities and types shared across the CloudX environment test crates.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for suite configuration
pub mod config;
