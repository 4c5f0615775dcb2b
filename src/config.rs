//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the path given on the command line), then
//! applies `BACKEND_URL`, `WAI_LOG_LEVEL` and `WAI_VARIANT` env overrides.
//! `LLM_API_KEY` is only ever read from the environment.

use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;

use crate::error::AppError;

/// Which operating mode the bot runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Backend replies arrive later; free text goes to `/user-message` and a
    /// background loop drains `/get-pending-messages`.
    Polling,
    /// Backend replies inline; free text is translated by the LLM into
    /// commands and plain lines.
    Sync,
}

impl FromStr for Variant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polling" => Ok(Variant::Polling),
            "sync" => Ok(Variant::Sync),
            other => Err(AppError::Config(format!("unknown variant: '{other}'"))),
        }
    }
}

/// Body encoding for `/ask-llm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AskLlmEncoding {
    Json,
    Form,
}

/// Backend HTTP service configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    pub ask_llm_encoding: AskLlmEncoding,
}

/// Pending-message poll loop configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// Substring replaced in every pending message before delivery.
    pub rewrite_from: String,
    pub rewrite_to: String,
}

/// Intent loop configuration.
#[derive(Debug, Clone)]
pub struct IntentConfig {
    /// Keep only the newest N history messages per sender. `None` = unbounded.
    pub history_cap: Option<usize>,
}

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration used by the intent loop.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"` or `"openai"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
    /// Sender address attached to every console message.
    pub sender: String,
}

#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
}

/// Fully-resolved bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    pub variant: Variant,
    pub backend: BackendConfig,
    pub poll: PollConfig,
    pub intent: IntentConfig,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY` env var: `None` for keyless local models.
    /// Never sourced from TOML.
    pub llm_api_key: Option<String>,
    pub comms: CommsConfig,
}

impl Config {
    /// Returns `true` if the console channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }
}

/// Env-sourced overrides, collected once so tests can pass them explicitly.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub log_level: Option<String>,
    pub variant: Option<String>,
    pub llm_api_key: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            backend_url: env::var("BACKEND_URL").ok(),
            log_level: env::var("WAI_LOG_LEVEL").ok(),
            variant: env::var("WAI_VARIANT").ok(),
            llm_api_key: env::var("LLM_API_KEY").ok(),
        }
    }
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    backend: RawBackend,
    #[serde(default)]
    poll: RawPoll,
    #[serde(default)]
    intent: RawIntent,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    comms: RawComms,
}

#[derive(Deserialize)]
struct RawBot {
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_variant")]
    variant: Variant,
}

#[derive(Deserialize)]
struct RawBackend {
    #[serde(default = "default_backend_url")]
    base_url: String,
    #[serde(default = "default_backend_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_ask_llm_encoding")]
    ask_llm_encoding: AskLlmEncoding,
}

impl Default for RawBackend {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_seconds: default_backend_timeout_seconds(),
            ask_llm_encoding: default_ask_llm_encoding(),
        }
    }
}

#[derive(Deserialize)]
struct RawPoll {
    #[serde(default = "default_poll_interval_ms")]
    interval_ms: u64,
    #[serde(default = "default_rewrite_from")]
    rewrite_from: String,
    #[serde(default = "default_rewrite_to")]
    rewrite_to: String,
}

impl Default for RawPoll {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            rewrite_from: default_rewrite_from(),
            rewrite_to: default_rewrite_to(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawIntent {
    history_cap: Option<usize>,
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
}

#[derive(Deserialize)]
struct RawPty {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_pty_sender")]
    sender: String,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true, sender: default_pty_sender() }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_variant() -> Variant { Variant::Polling }
fn default_backend_url() -> String { "http://localhost:8000".to_string() }
fn default_backend_timeout_seconds() -> u64 { 30 }
fn default_ask_llm_encoding() -> AskLlmEncoding { AskLlmEncoding::Json }
fn default_poll_interval_ms() -> u64 { 5000 }
fn default_rewrite_from() -> String { "https://sepolia.basescan.org".to_string() }
fn default_rewrite_to() -> String { "https://base-sepolia.blockscout.com".to_string() }
fn default_llm_provider() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_openai_timeout_seconds() -> u64 { 60 }
fn default_pty_sender() -> String { "console".to_string() }

fn default_true() -> bool {
    true
}

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let path = expand_home(path.unwrap_or("config/default.toml"));
    load_from(&path, &Overrides::from_env())
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let b = parsed.bot;

    let variant = match overrides.variant.as_deref() {
        Some(v) => v.parse()?,
        None => b.variant,
    };

    let base_url = overrides
        .backend_url
        .clone()
        .unwrap_or(parsed.backend.base_url)
        .trim_end_matches('/')
        .to_string();
    if base_url.is_empty() {
        return Err(AppError::Config("backend base_url must not be empty".into()));
    }

    if parsed.poll.interval_ms == 0 {
        return Err(AppError::Config("poll interval_ms must be > 0".into()));
    }

    Ok(Config {
        bot_name: b.name,
        log_level: overrides.log_level.clone().unwrap_or(b.log_level),
        variant,
        backend: BackendConfig {
            base_url,
            timeout_seconds: parsed.backend.timeout_seconds,
            ask_llm_encoding: parsed.backend.ask_llm_encoding,
        },
        poll: PollConfig {
            interval_ms: parsed.poll.interval_ms,
            rewrite_from: parsed.poll.rewrite_from,
            rewrite_to: parsed.poll.rewrite_to,
        },
        intent: IntentConfig {
            history_cap: parsed.intent.history_cap,
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        llm_api_key: overrides.llm_api_key.clone(),
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
                sender: parsed.comms.pty.sender,
            },
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for tests: dummy LLM, no API keys, backend at `base_url`.
impl Config {
    pub fn test_default(base_url: &str, variant: Variant) -> Self {
        Self {
            bot_name: "test".into(),
            log_level: "info".into(),
            variant,
            backend: BackendConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout_seconds: 5,
                ask_llm_encoding: AskLlmEncoding::Json,
            },
            poll: PollConfig {
                interval_ms: default_poll_interval_ms(),
                rewrite_from: default_rewrite_from(),
                rewrite_to: default_rewrite_to(),
            },
            intent: IntentConfig { history_cap: None },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            llm_api_key: None,
            comms: CommsConfig {
                pty: PtyConfig { enabled: false, sender: default_pty_sender() },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[bot]
name = "test-bot"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config_uses_defaults() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.variant, Variant::Polling);
        assert_eq!(cfg.poll.interval_ms, 5000);
        assert_eq!(cfg.poll.rewrite_from, "https://sepolia.basescan.org");
        assert_eq!(cfg.poll.rewrite_to, "https://base-sepolia.blockscout.com");
        assert_eq!(cfg.backend.ask_llm_encoding, AskLlmEncoding::Json);
        assert_eq!(cfg.intent.history_cap, None);
        assert_eq!(cfg.llm.provider, "dummy");
        assert!(cfg.comms_pty_should_load());
    }

    #[test]
    fn parse_full_config() {
        let f = write_toml(
            r#"
[bot]
name = "wai"
log_level = "debug"
variant = "sync"

[backend]
base_url = "http://backend:9000/"
timeout_seconds = 3
ask_llm_encoding = "form"

[poll]
interval_ms = 250

[intent]
history_cap = 8

[llm]
default = "openai"

[llm.openai]
model = "gpt-4o"

[comms.pty]
enabled = false
sender = "0xABC"
"#,
        );
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.variant, Variant::Sync);
        assert_eq!(cfg.backend.base_url, "http://backend:9000");
        assert_eq!(cfg.backend.timeout_seconds, 3);
        assert_eq!(cfg.backend.ask_llm_encoding, AskLlmEncoding::Form);
        assert_eq!(cfg.poll.interval_ms, 250);
        assert_eq!(cfg.intent.history_cap, Some(8));
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.openai.model, "gpt-4o");
        assert!(!cfg.comms_pty_should_load());
        assert_eq!(cfg.comms.pty.sender, "0xABC");
    }

    #[test]
    fn env_overrides_win() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = Overrides {
            backend_url: Some("http://override:1234/".into()),
            log_level: Some("trace".into()),
            variant: Some("SYNC".into()),
            llm_api_key: Some("sk-test".into()),
        };
        let cfg = load_from(f.path(), &overrides).unwrap();
        assert_eq!(cfg.backend.base_url, "http://override:1234");
        assert_eq!(cfg.log_level, "trace");
        assert_eq!(cfg.variant, Variant::Sync);
        assert_eq!(cfg.llm_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn unknown_variant_override_errors() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = Overrides { variant: Some("batch".into()), ..Default::default() };
        let err = load_from(f.path(), &overrides).unwrap_err();
        assert!(err.to_string().contains("unknown variant"));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let f = write_toml("[bot]\nname = \"x\"\n[poll]\ninterval_ms = 0\n");
        assert!(load_from(f.path(), &Overrides::default()).is_err());
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), &Overrides::default());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/wai/config.toml");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with("config.toml"));
    }

    #[test]
    fn relative_path_unchanged() {
        assert_eq!(expand_home("config/default.toml"), PathBuf::from("config/default.toml"));
    }
}
