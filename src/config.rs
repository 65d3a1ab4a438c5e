use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// Environment variable names understood by the CLI.
pub const ENDPOINT_ENV: &str = "OCHAT_ENDPOINT";
pub const API_KEY_ENV: &str = "OCHAT_API_KEY";
pub const DEPLOYMENT_ENV: &str = "OCHAT_DEPLOYMENT";
pub const SYSTEM_PROMPT_ENV: &str = "OCHAT_SYSTEM_PROMPT";
pub const TEMPERATURE_ENV: &str = "OCHAT_TEMPERATURE";
pub const MAX_TOKENS_ENV: &str = "OCHAT_MAX_TOKENS";
pub const TIMEOUT_ENV: &str = "OCHAT_TIMEOUT";
pub const RETRIES_ENV: &str = "OCHAT_RETRIES";
pub const RETRY_DELAY_ENV: &str = "OCHAT_RETRY_DELAY";
pub const SEARCH_ENDPOINT_ENV: &str = "OCHAT_SEARCH_ENDPOINT";
pub const SEARCH_KEY_ENV: &str = "OCHAT_SEARCH_KEY";
pub const SEARCH_INDEX_ENV: &str = "OCHAT_SEARCH_INDEX";
pub const EMBEDDING_DEPLOYMENT_ENV: &str = "OCHAT_EMBEDDING_DEPLOYMENT";
pub const CONFIG_PATH_ENV: &str = "OCHAT_CONFIG";

/// Compiled-in fallbacks, substituted when scaffolding a client for a
/// specific deployment. Empty means "must come from the environment".
pub const DEFAULT_ENDPOINT: &str = "";
pub const DEFAULT_API_KEY: &str = "";
pub const DEFAULT_DEPLOYMENT: &str = "";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// One named profile from the config file. API keys never live here.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileConfig {
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
    pub search_endpoint: Option<String>,
    pub search_index: Option<String>,
    pub embedding_deployment: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

/// Returns the environment value if set and non-blank.
pub fn env_nonempty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses a numeric environment value, failing with an explicit message.
pub fn env_parsed<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env_nonempty(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid {name} '{raw}'.")),
    }
}

/// Loads a named profile from the resolved config file.
pub fn load_profile(name: &str) -> Result<ProfileConfig, String> {
    let path = config_path()?;
    load_profile_from(&path, name)
}

pub(crate) fn load_profile_from(path: &Path, name: &str) -> Result<ProfileConfig, String> {
    let profiles = read_profiles(path)?;
    profiles.get(name).cloned().ok_or_else(|| {
        format!(
            "Profile '{}' not found in config file '{}'.",
            name,
            path.display()
        )
    })
}

/// Checks that the config file parses and, when given, that the profile
/// exists. Returns the resolved path.
pub fn validate_config(profile: Option<&str>) -> Result<PathBuf, String> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;
    if let Some(name) = profile
        && !profiles.contains_key(name)
    {
        return Err(format!(
            "Profile '{}' not found in config file '{}'.",
            name,
            path.display()
        ));
    }
    Ok(path)
}

fn read_profiles(path: &Path) -> Result<HashMap<String, ProfileConfig>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read config file '{}': {err}", path.display()))?;

    let config: ConfigFile = toml::from_str(&raw)
        .map_err(|err| format!("Failed to parse config file '{}': {err}", path.display()))?;

    config.profiles.ok_or_else(|| {
        format!(
            "Config file '{}' does not contain a [profiles] section.",
            path.display()
        )
    })
}

fn config_path() -> Result<PathBuf, String> {
    if let Some(path) = env_nonempty(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    if let Some(xdg) = env_nonempty("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("ochat").join("config.toml"));
    }

    let home = env::var("HOME").map_err(|_| {
        format!("Cannot resolve config path: set {CONFIG_PATH_ENV} or HOME/XDG_CONFIG_HOME.")
    })?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("ochat")
        .join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::load_profile_from;

    fn unique_temp_path(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("ochat-test-{label}-{nanos}"))
    }

    #[test]
    fn profile_fields_are_loaded() {
        let path = unique_temp_path("profile");
        fs::write(
            &path,
            "[profiles.work]\nendpoint = \"https://example.net/v1\"\ndeployment = \"gpt-4o-mini\"\ntemperature = 0.2\n",
        )
        .unwrap();

        let profile = load_profile_from(&path, "work").unwrap();
        assert_eq!(profile.endpoint.as_deref(), Some("https://example.net/v1"));
        assert_eq!(profile.deployment.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(profile.temperature, Some(0.2));
        assert!(profile.search_index.is_none());
    }

    #[test]
    fn missing_profile_is_an_explicit_error() {
        let path = unique_temp_path("missing-profile");
        fs::write(&path, "[profiles.other]\ndeployment = \"x\"\n").unwrap();

        let err = load_profile_from(&path, "work").unwrap_err();
        assert!(err.contains("Profile 'work' not found"));
    }

    #[test]
    fn file_without_profiles_section_is_rejected() {
        let path = unique_temp_path("no-profiles");
        fs::write(&path, "unrelated = true\n").unwrap();

        let err = load_profile_from(&path, "work").unwrap_err();
        assert!(err.contains("does not contain a [profiles] section"));
    }
}
