use std::fmt;

use reqwest::StatusCode;

/// Failure modes of a chat session and its transport.
#[derive(Debug)]
pub enum ChatError {
    /// A required connection parameter is empty or unset.
    MissingConfig { name: &'static str },
    /// The HTTP request could not be completed.
    Request { source: reqwest::Error },
    /// The service answered with a non-success status.
    Api { status: StatusCode, body: String },
    /// The completion carried neither content nor a function call.
    EmptyResponse,
    /// The model requested a function that is not registered.
    UnknownFunction { name: String },
    /// The model kept requesting function calls past the round limit.
    FunctionCallLimit { rounds: u32 },
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingConfig { name } => {
                write!(f, "Missing required configuration value: {name}")
            }
            Self::Request { source } => write!(f, "Chat request failed: {source}"),
            Self::Api { status, body } => write!(f, "Chat API error {status}: {body}"),
            Self::EmptyResponse => {
                write!(f, "Chat response did not contain message content")
            }
            Self::UnknownFunction { name } => {
                write!(f, "Model requested unregistered function '{name}'")
            }
            Self::FunctionCallLimit { rounds } => {
                write!(f, "Model kept calling functions after {rounds} rounds; giving up")
            }
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source } => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(source: reqwest::Error) -> Self {
        Self::Request { source }
    }
}
