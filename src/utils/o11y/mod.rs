//! Common observability utilities.
//!
//! This module provides the tracing subscriber and logging helpers used by the
//! library and the `select_targets` binary.
//!
pub mod logging;
