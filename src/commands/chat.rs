use std::io::{self, BufRead, Write};

use clap::Args;
use owo_colors::OwoColorize;
use serde_json::{Value, json};

use crate::chat::builtins::sample_registry;
use crate::chat::openai::{OpenAiBackend, TransportOptions};
use crate::chat::registry::FunctionRegistry;
use crate::chat::session::{ChatEvent, ChatSession, SessionOptions};
use crate::config;

#[derive(Debug, Args, Clone)]
pub struct ChatArgs {
    /// API base URL, e.g. https://api.openai.com/v1
    #[arg(long)]
    endpoint: Option<String>,
    /// Deployment/model identifier
    #[arg(long)]
    deployment: Option<String>,
    /// System prompt opening the conversation
    #[arg(long)]
    system: Option<String>,
    /// Profile name from the config file
    #[arg(long)]
    profile: Option<String>,
    #[arg(long)]
    temperature: Option<f32>,
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Retry count for transient transport failures
    #[arg(long)]
    retries: Option<u32>,
    /// Base retry delay in milliseconds
    #[arg(long)]
    retry_delay: Option<u64>,
    /// Wait for the full reply instead of streaming tokens
    #[arg(long)]
    no_stream: bool,
    /// Do not advertise the built-in sample functions
    #[arg(long)]
    no_functions: bool,
    /// Print each request payload instead of calling the service
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug)]
struct Settings {
    endpoint: String,
    api_key: String,
    deployment: String,
    system: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<u64>,
    retries: u32,
    retry_delay: Option<u64>,
    search: Option<SearchSettings>,
}

#[derive(Debug)]
struct SearchSettings {
    endpoint: String,
    key: String,
    index: String,
    embedding_deployment: Option<String>,
}

fn nonempty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn resolve(args: &ChatArgs) -> Result<Settings, String> {
    let profile = match &args.profile {
        Some(name) => config::load_profile(name)?,
        None => config::ProfileConfig::default(),
    };

    let endpoint = args
        .endpoint
        .clone()
        .or_else(|| config::env_nonempty(config::ENDPOINT_ENV))
        .or(profile.endpoint)
        .or_else(|| nonempty(config::DEFAULT_ENDPOINT))
        .ok_or_else(|| {
            format!(
                "No endpoint configured. Use --endpoint or set {}.",
                config::ENDPOINT_ENV
            )
        })?;

    let api_key = config::env_nonempty(config::API_KEY_ENV)
        .or_else(|| nonempty(config::DEFAULT_API_KEY))
        .or_else(|| args.dry_run.then(|| "dry-run".to_string()))
        .ok_or_else(|| format!("No API key configured. Set {}.", config::API_KEY_ENV))?;

    let deployment = args
        .deployment
        .clone()
        .or_else(|| config::env_nonempty(config::DEPLOYMENT_ENV))
        .or(profile.deployment)
        .or_else(|| nonempty(config::DEFAULT_DEPLOYMENT))
        .ok_or_else(|| {
            format!(
                "No deployment configured. Use --deployment or set {}.",
                config::DEPLOYMENT_ENV
            )
        })?;

    let system = args
        .system
        .clone()
        .or_else(|| config::env_nonempty(config::SYSTEM_PROMPT_ENV))
        .or(profile.system)
        .unwrap_or_else(|| config::DEFAULT_SYSTEM_PROMPT.to_string());

    let temperature = match args.temperature {
        Some(value) => Some(value),
        None => config::env_parsed(config::TEMPERATURE_ENV)?.or(profile.temperature),
    };
    let max_tokens = match args.max_tokens {
        Some(value) => Some(value),
        None => config::env_parsed(config::MAX_TOKENS_ENV)?.or(profile.max_tokens),
    };
    let timeout = match args.timeout {
        Some(value) => Some(value),
        None => config::env_parsed(config::TIMEOUT_ENV)?.or(profile.timeout),
    };
    let retries = match args.retries {
        Some(value) => Some(value),
        None => config::env_parsed(config::RETRIES_ENV)?.or(profile.retries),
    }
    .unwrap_or(0);
    let retry_delay = match args.retry_delay {
        Some(value) => Some(value),
        None => config::env_parsed(config::RETRY_DELAY_ENV)?.or(profile.retry_delay),
    };

    let search_index =
        config::env_nonempty(config::SEARCH_INDEX_ENV).or(profile.search_index);
    let search = match search_index {
        None => None,
        Some(index) => {
            let endpoint = config::env_nonempty(config::SEARCH_ENDPOINT_ENV)
                .or(profile.search_endpoint)
                .ok_or_else(|| {
                    format!(
                        "Search index configured but no search endpoint. Set {}.",
                        config::SEARCH_ENDPOINT_ENV
                    )
                })?;
            let key = config::env_nonempty(config::SEARCH_KEY_ENV).ok_or_else(|| {
                format!(
                    "Search index configured but no search key. Set {}.",
                    config::SEARCH_KEY_ENV
                )
            })?;
            Some(SearchSettings {
                endpoint,
                key,
                index,
                embedding_deployment: config::env_nonempty(config::EMBEDDING_DEPLOYMENT_ENV)
                    .or(profile.embedding_deployment),
            })
        }
    };

    Ok(Settings {
        endpoint,
        api_key,
        deployment,
        system,
        temperature,
        max_tokens,
        timeout,
        retries,
        retry_delay,
        search,
    })
}

fn data_source(search: &SearchSettings) -> Value {
    let mut parameters = json!({
        "endpoint": search.endpoint,
        "index_name": search.index,
        "authentication": {
            "type": "api_key",
            "key": search.key,
        },
    });
    if let Some(deployment) = &search.embedding_deployment {
        parameters["query_type"] = json!("vector");
        parameters["embedding_dependency"] = json!({
            "type": "deployment_name",
            "deployment_name": deployment,
        });
    }
    json!({"type": "azure_search", "parameters": parameters})
}

fn print_event(event: ChatEvent<'_>) {
    match event {
        ChatEvent::Token(token) => {
            print!("{token}");
            let _ = io::stdout().flush();
        }
        ChatEvent::FunctionCall {
            name,
            arguments,
            result,
        } => {
            let trace = format!("assistant-function: {name}({arguments}) => {result}");
            println!("\r{}", trace.cyan());
            print!("\nAssistant: ");
            let _ = io::stdout().flush();
        }
    }
}

pub async fn run(args: ChatArgs) -> Result<(), String> {
    let settings = resolve(&args)?;

    let registry = if args.no_functions {
        FunctionRegistry::new()
    } else {
        sample_registry()
    };

    let backend = OpenAiBackend::new(
        &settings.endpoint,
        &settings.api_key,
        TransportOptions {
            timeout_secs: settings.timeout,
            retries: settings.retries,
            retry_delay_ms: settings.retry_delay,
        },
    )
    .map_err(|err| err.to_string())?;

    let mut session = ChatSession::new(
        Box::new(backend),
        &settings.deployment,
        &settings.system,
        registry,
        SessionOptions {
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            ..SessionOptions::default()
        },
    )
    .map_err(|err| err.to_string())?;
    if let Some(search) = &settings.search {
        session = session.with_data_sources(vec![data_source(search)]);
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{}", "User: ".bold());
        let _ = io::stdout().flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            // EOF or a failed read ends the conversation, not the process.
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim_end_matches('\n').trim_end_matches('\r');
        if input.is_empty() || input == "exit" {
            break;
        }

        if args.dry_run {
            let request = session.preview_request(input);
            let payload =
                serde_json::to_string(&request).map_err(|err| err.to_string())?;
            println!("{payload}");
            continue;
        }

        if args.no_stream {
            let reply = session.send(input).await.map_err(|err| err.to_string())?;
            println!("Assistant: {reply}\n");
            continue;
        }

        print!("Assistant: ");
        let _ = io::stdout().flush();
        session
            .send_streaming(input, print_event)
            .await
            .map_err(|err| err.to_string())?;
        println!("\n");
    }

    Ok(())
}
