use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn scrub_env(cmd: &mut Command) {
    cmd.env_remove("OCHAT_ENDPOINT")
        .env_remove("OCHAT_API_KEY")
        .env_remove("OCHAT_DEPLOYMENT")
        .env_remove("OCHAT_SYSTEM_PROMPT")
        .env_remove("OCHAT_TEMPERATURE")
        .env_remove("OCHAT_MAX_TOKENS")
        .env_remove("OCHAT_TIMEOUT")
        .env_remove("OCHAT_RETRIES")
        .env_remove("OCHAT_RETRY_DELAY")
        .env_remove("OCHAT_SEARCH_ENDPOINT")
        .env_remove("OCHAT_SEARCH_KEY")
        .env_remove("OCHAT_SEARCH_INDEX")
        .env_remove("OCHAT_EMBEDDING_DEPLOYMENT")
        .env_remove("OCHAT_CONFIG");
}

fn ochat_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ochat"));
    scrub_env(&mut cmd);
    cmd
}

fn occhat_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("occhat"));
    scrub_env(&mut cmd);
    cmd
}

fn connected(cmd: &mut Command) -> &mut Command {
    cmd.env("OCHAT_ENDPOINT", "http://127.0.0.1:9/v1")
        .env("OCHAT_API_KEY", "test-key")
        .env("OCHAT_DEPLOYMENT", "gpt-test")
}

fn unique_temp_path(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("ochat-test-{label}-{nanos}"))
}

#[test]
fn missing_endpoint_refuses_to_start() {
    occhat_cmd()
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stderr(contains(
            "No endpoint configured. Use --endpoint or set OCHAT_ENDPOINT.",
        ));
}

#[test]
fn missing_deployment_refuses_to_start() {
    occhat_cmd()
        .env("OCHAT_ENDPOINT", "http://127.0.0.1:9/v1")
        .env("OCHAT_API_KEY", "test-key")
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stderr(contains(
            "No deployment configured. Use --deployment or set OCHAT_DEPLOYMENT.",
        ));
}

#[test]
fn exit_input_terminates_without_a_request() {
    // The endpoint is unreachable; reaching it would fail the run.
    connected(&mut occhat_cmd())
        .write_stdin("exit\n")
        .assert()
        .success()
        .stdout(contains("User: "));
}

#[test]
fn empty_input_terminates_without_a_request() {
    connected(&mut occhat_cmd())
        .write_stdin("\n")
        .assert()
        .success();
}

#[test]
fn end_of_input_terminates_gracefully() {
    connected(&mut occhat_cmd())
        .write_stdin("")
        .assert()
        .success();
}

#[test]
fn invalid_temperature_env_is_an_explicit_error() {
    connected(&mut occhat_cmd())
        .env("OCHAT_TEMPERATURE", "warm")
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(contains("Invalid OCHAT_TEMPERATURE 'warm'."));
}

#[test]
fn unreachable_endpoint_is_fatal_to_the_process() {
    connected(&mut ochat_cmd())
        .args(["chat", "--no-stream"])
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stderr(contains("Chat request failed"));
}

#[test]
fn dry_run_succeeds_without_api_key() {
    occhat_cmd()
        .env("OCHAT_ENDPOINT", "http://127.0.0.1:9/v1")
        .env("OCHAT_DEPLOYMENT", "gpt-test")
        .arg("--dry-run")
        .write_stdin("hello\nexit\n")
        .assert()
        .success()
        .stdout(contains("\"model\":\"gpt-test\""));
}

#[test]
fn dry_run_request_has_stream_functions_and_system_prompt() {
    let assert = connected(&mut occhat_cmd())
        .arg("--dry-run")
        .write_stdin("hello\nexit\n")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("\"stream\":true"));
    assert!(stdout.contains("get_current_weather"));
    assert!(stdout.contains("\"function_call\":\"auto\""));
    assert!(stdout.contains("You are a helpful AI assistant."));
    assert!(stdout.contains("\"content\":\"hello\""));
}

#[test]
fn no_functions_flag_drops_function_schemas() {
    let assert = connected(&mut occhat_cmd())
        .args(["--dry-run", "--no-functions"])
        .write_stdin("hello\nexit\n")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(!stdout.contains("\"functions\""));
}

#[test]
fn deployment_flag_overrides_environment() {
    connected(&mut occhat_cmd())
        .args(["--dry-run", "--deployment", "from-flag"])
        .write_stdin("hello\nexit\n")
        .assert()
        .success()
        .stdout(contains("\"model\":\"from-flag\""));
}

#[test]
fn search_settings_attach_a_data_source() {
    connected(&mut occhat_cmd())
        .env("OCHAT_SEARCH_ENDPOINT", "https://search.example.net")
        .env("OCHAT_SEARCH_KEY", "search-key")
        .env("OCHAT_SEARCH_INDEX", "docs")
        .arg("--dry-run")
        .write_stdin("hello\nexit\n")
        .assert()
        .success()
        .stdout(contains("\"azure_search\"").and(contains("\"index_name\":\"docs\"")));
}

#[test]
fn search_index_without_key_is_an_explicit_error() {
    connected(&mut occhat_cmd())
        .env("OCHAT_SEARCH_ENDPOINT", "https://search.example.net")
        .env("OCHAT_SEARCH_INDEX", "docs")
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(contains("Set OCHAT_SEARCH_KEY."));
}

#[test]
fn profile_supplies_endpoint_and_deployment() {
    let config_path = unique_temp_path("profile");
    fs::write(
        &config_path,
        "[profiles.work]\nendpoint = \"http://127.0.0.1:9/v1\"\ndeployment = \"profile-model\"\n",
    )
    .unwrap();

    occhat_cmd()
        .env("OCHAT_CONFIG", &config_path)
        .args(["--profile", "work", "--dry-run"])
        .write_stdin("hello\nexit\n")
        .assert()
        .success()
        .stdout(contains("\"model\":\"profile-model\""));
}

#[test]
fn profile_is_not_implicit_when_not_passed() {
    let config_path = unique_temp_path("no-implicit");
    fs::write(
        &config_path,
        "[profiles.default]\nendpoint = \"http://127.0.0.1:9/v1\"\ndeployment = \"gpt-test\"\n",
    )
    .unwrap();

    occhat_cmd()
        .env("OCHAT_CONFIG", &config_path)
        .arg("--dry-run")
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stderr(contains(
            "No endpoint configured. Use --endpoint or set OCHAT_ENDPOINT.",
        ));
}

#[test]
fn config_check_reports_ok() {
    let config_path = unique_temp_path("config-ok");
    fs::write(&config_path, "[profiles.work]\ndeployment = \"gpt-test\"\n").unwrap();

    ochat_cmd()
        .env("OCHAT_CONFIG", &config_path)
        .args(["config", "check", "--profile", "work"])
        .assert()
        .success()
        .stdout(contains("config OK: "));
}

#[test]
fn config_check_rejects_unknown_profile() {
    let config_path = unique_temp_path("config-unknown");
    fs::write(&config_path, "[profiles.work]\ndeployment = \"gpt-test\"\n").unwrap();

    ochat_cmd()
        .env("OCHAT_CONFIG", &config_path)
        .args(["config", "check", "--profile", "home"])
        .assert()
        .failure()
        .stderr(contains("Profile 'home' not found"));
}

#[test]
fn config_check_reports_missing_file() {
    let config_path = unique_temp_path("config-missing");

    ochat_cmd()
        .env("OCHAT_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(contains("Failed to read config file"));
}

#[test]
fn completion_generates_a_script() {
    ochat_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(contains("ochat"));
}
