//! Conversation-session core for chat-completion services.
//!
//! The module owns the message history model, the function registry used
//! for model-side function calling, and the streaming session loop that
//! ties both to an OpenAI-compatible backend.

/// Backend trait and request/response types.
pub mod backend;
/// Stock sample functions registered by the CLI.
pub mod builtins;
/// Session and transport error taxonomy.
pub mod error;
/// Conversation message and role types.
pub mod message;
/// OpenAI-compatible HTTP backend with SSE streaming.
pub mod openai;
pub(crate) mod retry;
/// Name-keyed function registry and schema builder.
pub mod registry;
/// Conversation session and function-call accumulator.
pub mod session;
