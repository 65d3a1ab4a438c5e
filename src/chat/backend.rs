use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::Serialize;
use serde_json::Value;

use crate::chat::error::ChatError;
use crate::chat::message::{FunctionCall, Message};

/// Chat-completions request payload (legacy function-calling shape).
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Deployment/model identifier.
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
    /// Retrieval-augmentation extension, when a search index is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_sources: Option<Vec<Value>>,
}

/// Service-reported cause for response termination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    FunctionCall,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Maps the wire string to a reason.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "function_call" => Self::FunctionCall,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One incremental chunk of a streamed response, flattened to the fields
/// the session consumes.
#[derive(Debug, Clone, Default)]
pub struct StreamDelta {
    /// Content fragment, delivered in arrival order.
    pub content: Option<String>,
    /// Function name; the service sends the full name, not chunks.
    pub function_name: Option<String>,
    /// Latest full partial arguments text, resent per chunk.
    pub function_arguments: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

/// Full (non-streamed) completion result.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: Option<String>,
    pub function_call: Option<FunctionCall>,
    pub finish_reason: Option<FinishReason>,
}

/// Ordered stream of deltas; clean end-of-stream is normal termination.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta, ChatError>> + Send>>;

/// Remote completion service seen by a [`crate::chat::session::ChatSession`].
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Performs one blocking completion call.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ChatError>;

    /// Opens one response stream for the request.
    async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream, ChatError>;
}
