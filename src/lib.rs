//! Minimal command-line chat client for hosted chat-completion APIs.
//!
//! Supports streamed replies, model-side function calling against a local
//! registry, and optional retrieval augmentation via a search index.

/// Conversation session, registry, and transport.
pub mod chat;
/// CLI subcommand implementations.
pub mod commands;
/// Environment and TOML profile configuration.
pub mod config;
