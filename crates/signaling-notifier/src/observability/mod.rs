//! Observability for the notifier.
//!
//! Logging goes through `tracing` with `notifier.*` targets; subscriber setup
//! lives in `common::observability`. This module holds delivery metrics.

pub mod metrics;
