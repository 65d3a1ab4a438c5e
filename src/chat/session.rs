use futures_util::StreamExt;
use serde_json::Value;

use crate::chat::backend::{ChatBackend, CompletionRequest, FinishReason, StreamDelta};
use crate::chat::error::ChatError;
use crate::chat::message::Message;
use crate::chat::registry::FunctionRegistry;

/// Suffix appended when the service truncates a reply at the token limit.
pub const TOKEN_LIMIT_WARNING: &str = "\nWARNING: Exceeded token limit!";
/// Suffix appended when the service filtered the reply content.
pub const CONTENT_FILTER_WARNING: &str = "\nWARNING: Content filtered!";

/// Per-session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Upper bound on consecutive function-call rounds within one turn.
    /// The source templates loop without a cap; a misbehaving model that
    /// always answers with a function call would never terminate.
    pub max_function_rounds: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            max_function_rounds: 10,
        }
    }
}

/// Event delivered to the caller while a streamed turn is in progress.
#[derive(Debug)]
pub enum ChatEvent<'a> {
    /// One non-empty content fragment, in arrival order.
    Token(&'a str),
    /// A registered function was invoked on the model's behalf.
    FunctionCall {
        name: &'a str,
        arguments: &'a str,
        result: &'a str,
    },
}

/// Accumulates a partial function call across the chunks of one stream.
///
/// The service sends the full name once and resends the latest full partial
/// arguments text per chunk, so both fields are overwritten, not appended.
#[derive(Debug, Default)]
struct FunctionCallBuffer {
    name: String,
    arguments: String,
}

impl FunctionCallBuffer {
    fn observe(&mut self, delta: &StreamDelta) -> bool {
        let mut updated = false;
        if let Some(name) = delta.function_name.as_deref()
            && !name.is_empty()
        {
            self.name = name.to_string();
            updated = true;
        }
        if let Some(arguments) = delta.function_arguments.as_deref()
            && !arguments.is_empty()
        {
            self.arguments = arguments.to_string();
            updated = true;
        }
        updated
    }

    fn is_pending(&self) -> bool {
        !self.name.is_empty()
    }

    fn clear(&mut self) {
        self.name.clear();
        self.arguments.clear();
    }
}

/// One conversation against a remote completion service.
///
/// Owns the ordered message history and mediates every call to the backend.
/// Not safe for concurrent turns; the history is mutated in place.
pub struct ChatSession {
    backend: Box<dyn ChatBackend>,
    deployment: String,
    messages: Vec<Message>,
    registry: FunctionRegistry,
    options: SessionOptions,
    pending_call: FunctionCallBuffer,
    data_sources: Option<Vec<Value>>,
}

impl ChatSession {
    /// Creates a session whose history starts as `[system message]`.
    pub fn new(
        backend: Box<dyn ChatBackend>,
        deployment: impl Into<String>,
        system_prompt: impl Into<String>,
        registry: FunctionRegistry,
        options: SessionOptions,
    ) -> Result<Self, ChatError> {
        let deployment = deployment.into();
        if deployment.trim().is_empty() {
            return Err(ChatError::MissingConfig { name: "deployment" });
        }

        Ok(Self {
            backend,
            deployment,
            messages: vec![Message::system(system_prompt)],
            registry,
            options,
            pending_call: FunctionCallBuffer::default(),
            data_sources: None,
        })
    }

    /// Attaches a retrieval-augmentation extension to every request.
    pub fn with_data_sources(mut self, data_sources: Vec<Value>) -> Self {
        self.data_sources = Some(data_sources);
        self
    }

    /// The conversation history, system message first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Truncates the history back to the system message and drops any
    /// partially accumulated function call.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
        self.pending_call.clear();
    }

    /// Sends one user turn without streaming and returns the reply text.
    ///
    /// Function schemas are not advertised on this path, matching the
    /// plain-completion variants: history always grows by exactly two
    /// messages per successful call. On failure the user message stays
    /// appended and no assistant message is added.
    pub async fn send(&mut self, user_text: &str) -> Result<String, ChatError> {
        self.messages.push(Message::user(user_text));

        let request = self.request(false, false);
        let completion = self.backend.complete(&request).await?;
        let mut content = completion.content.ok_or(ChatError::EmptyResponse)?;
        match completion.finish_reason {
            Some(FinishReason::Length) => content.push_str(TOKEN_LIMIT_WARNING),
            Some(FinishReason::ContentFilter) => content.push_str(CONTENT_FILTER_WARNING),
            _ => {}
        }

        self.messages.push(Message::assistant(content.clone()));
        Ok(content)
    }

    /// Sends one user turn over a response stream.
    ///
    /// Delivers each non-empty content fragment via [`ChatEvent::Token`] in
    /// arrival order and returns the full concatenation once the model
    /// produces a terminal (non-function) response. Completed function
    /// calls are executed through the registry, recorded in the history as
    /// an assistant function-call message plus a function-result message,
    /// and the request is reissued with the updated history.
    pub async fn send_streaming<F>(
        &mut self,
        user_text: &str,
        mut on_event: F,
    ) -> Result<String, ChatError>
    where
        F: FnMut(ChatEvent<'_>),
    {
        self.messages.push(Message::user(user_text));
        self.pending_call.clear();

        let mut content = String::new();
        for _ in 0..self.options.max_function_rounds {
            let request = self.request(true, true);
            let mut deltas = self.backend.stream(&request).await?;

            while let Some(delta) = deltas.next().await {
                let delta = delta?;
                self.pending_call.observe(&delta);

                let mut fragment = delta.content.unwrap_or_default();
                match delta.finish_reason {
                    Some(FinishReason::Length) => fragment.push_str(TOKEN_LIMIT_WARNING),
                    Some(FinishReason::ContentFilter) => fragment.push_str(CONTENT_FILTER_WARNING),
                    _ => {}
                }
                if fragment.is_empty() {
                    continue;
                }

                on_event(ChatEvent::Token(&fragment));
                content.push_str(&fragment);
            }

            if self.pending_call.is_pending() {
                let name = std::mem::take(&mut self.pending_call.name);
                let arguments = std::mem::take(&mut self.pending_call.arguments);

                let result = self
                    .registry
                    .invoke(&name, &arguments)
                    .ok_or_else(|| ChatError::UnknownFunction { name: name.clone() })?;
                on_event(ChatEvent::FunctionCall {
                    name: &name,
                    arguments: &arguments,
                    result: &result,
                });

                self.messages
                    .push(Message::assistant_function_call(&name, &arguments));
                self.messages.push(Message::function_result(&name, &result));
                continue;
            }

            self.messages.push(Message::assistant(content.clone()));
            return Ok(content);
        }

        Err(ChatError::FunctionCallLimit {
            rounds: self.options.max_function_rounds,
        })
    }

    /// Builds the request the next streamed turn would send, without
    /// touching the history. Serves the CLI dry-run mode.
    pub fn preview_request(&self, user_text: &str) -> CompletionRequest {
        let mut request = self.request(true, true);
        request.messages.push(Message::user(user_text));
        request
    }

    fn request(&self, stream: bool, with_functions: bool) -> CompletionRequest {
        let advertise = with_functions && !self.registry.is_empty();
        CompletionRequest {
            model: self.deployment.clone(),
            messages: self.messages.clone(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            stream: stream.then_some(true),
            functions: advertise.then(|| self.registry.schemas()),
            function_call: advertise.then(|| Value::String("auto".to_string())),
            data_sources: self.data_sources.clone(),
        }
    }
}
