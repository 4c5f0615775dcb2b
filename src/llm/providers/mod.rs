//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory: called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod openai_compatible;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and an optional API key.
///
/// `api_key` is sourced from `LLM_API_KEY` env (never TOML) and is `None`
/// for keyless local models.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider::echo())),
        "openai" | "openai-compatible" => {
            let oai = &config.openai;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.temperature,
                oai.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Variant};

    #[test]
    fn builds_known_providers() {
        let mut cfg = Config::test_default("http://localhost:0", Variant::Sync).llm;
        assert!(matches!(build(&cfg, None), Ok(LlmProvider::Dummy(_))));

        cfg.provider = "openai".into();
        assert!(matches!(build(&cfg, Some("k".into())), Ok(LlmProvider::OpenAiCompatible(_))));
    }

    #[test]
    fn unknown_provider_errors() {
        let mut cfg = Config::test_default("http://localhost:0", Variant::Sync).llm;
        cfg.provider = "mystery".into();
        let err = build(&cfg, None).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }
}
