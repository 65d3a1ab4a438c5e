use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::chat::backend::{
    ChatBackend, Completion, CompletionRequest, DeltaStream, FinishReason, StreamDelta,
};
use crate::chat::error::ChatError;
use crate::chat::message::FunctionCall;
use crate::chat::retry::{RetryPolicy, post_with_retry};

/// OpenAI-compatible chat-completions backend over HTTP.
///
/// `endpoint` is the API base URL (e.g. `https://api.openai.com/v1`); the
/// `/chat/completions` path is appended here.
pub struct OpenAiBackend {
    client: reqwest::Client,
    url: String,
    api_key: String,
    policy: RetryPolicy,
}

/// Optional transport tuning for [`OpenAiBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportOptions {
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub retry_delay_ms: Option<u64>,
}

impl OpenAiBackend {
    /// Creates a backend, validating the connection parameters.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        options: TransportOptions,
    ) -> Result<Self, ChatError> {
        if endpoint.trim().is_empty() {
            return Err(ChatError::MissingConfig { name: "endpoint" });
        }
        if api_key.trim().is_empty() {
            return Err(ChatError::MissingConfig { name: "api key" });
        }

        let mut policy = RetryPolicy {
            timeout_secs: options.timeout_secs,
            retries: options.retries,
            ..RetryPolicy::default()
        };
        if let Some(delay) = options.retry_delay_ms {
            policy.retry_delay_ms = delay;
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            api_key: api_key.to_string(),
            policy,
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ChatError> {
        let response =
            post_with_retry(&self.client, &self.url, &self.api_key, request, self.policy).await?;
        let body: CompletionWire = response.json().await?;

        let choice = body.choices.into_iter().next().ok_or(ChatError::EmptyResponse)?;
        let completion = Completion {
            content: choice.message.content,
            function_call: choice.message.function_call.map(|call| FunctionCall {
                name: call.name.unwrap_or_default(),
                arguments: call.arguments.unwrap_or_default(),
            }),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
        };

        if completion.content.is_none() && completion.function_call.is_none() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(completion)
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream, ChatError> {
        let response =
            post_with_retry(&self.client, &self.url, &self.api_key, request, self.policy).await?;

        Ok(Box::pin(try_stream! {
            // Dropping `bytes` closes the connection on every exit path.
            let mut bytes = response.bytes_stream();
            let mut buffer = SseLineBuffer::default();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk?;
                for payload in buffer.push(&String::from_utf8_lossy(&chunk)) {
                    if let Some(delta) = parse_delta(&payload) {
                        yield delta;
                    }
                }
            }
            if let Some(payload) = buffer.take_remainder() {
                if let Some(delta) = parse_delta(&payload) {
                    yield delta;
                }
            }
        }))
    }
}

/// Reassembles SSE lines across arbitrary network chunk boundaries and
/// extracts `data:` payloads, dropping the `[DONE]` sentinel.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: String,
}

impl SseLineBuffer {
    fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes a trailing line that arrived without a final newline.
    fn take_remainder(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.pending);
        data_payload(&line)
    }
}

fn data_payload(line: &str) -> Option<String> {
    let data = line.trim_end_matches(['\n', '\r']).strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

/// Parses one SSE data payload. Malformed chunks are skipped.
fn parse_delta(payload: &str) -> Option<StreamDelta> {
    let chunk: ChunkWire = serde_json::from_str(payload).ok()?;
    let choice = chunk.choices.into_iter().next()?;
    let delta = choice.delta.unwrap_or_default();
    let function_call = delta.function_call.unwrap_or_default();

    Some(StreamDelta {
        content: delta.content,
        function_name: function_call.name,
        function_arguments: function_call.arguments,
        finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
    })
}

#[derive(Debug, Deserialize)]
struct CompletionWire {
    choices: Vec<ChoiceWire>,
}

#[derive(Debug, Deserialize)]
struct ChoiceWire {
    message: AssistantWire,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantWire {
    content: Option<String>,
    function_call: Option<FunctionCallWire>,
}

#[derive(Debug, Deserialize)]
struct ChunkWire {
    choices: Vec<ChunkChoiceWire>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoiceWire {
    delta: Option<DeltaWire>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DeltaWire {
    content: Option<String>,
    function_call: Option<FunctionCallWire>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionCallWire {
    name: Option<String>,
    arguments: Option<String>,
}
