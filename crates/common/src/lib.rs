//! Common utilities shared across the signaling notifier crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for observability configuration
pub mod config;

/// Module for tracing subscriber setup
pub mod observability;
