//! CLI subcommand implementations.

/// Interactive conversation loop.
pub mod chat;
/// Local config validation.
pub mod config;
