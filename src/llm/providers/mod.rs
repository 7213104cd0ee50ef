//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory — called once at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod openai_compatible;

use tracing::warn;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and an optional API key.
///
/// `api_key` is sourced from `LLM_API_KEY` env (never TOML). Selecting the
/// `openai` provider without a key degrades to the dummy backend with a
/// warning instead of failing startup — useful for local development.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "openai" | "openai-compatible" => {
            let Some(key) = api_key else {
                warn!("LLM_API_KEY not set, falling back to dummy provider");
                return Ok(LlmProvider::Dummy(dummy::DummyProvider));
            };
            let oai = &config.openai;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.temperature,
                oai.timeout_seconds,
                key,
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;

    fn llm_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            openai: OpenAiConfig {
                api_base_url: "https://api.openai.com/v1/chat/completions".into(),
                model: "gpt-4o-mini".into(),
                temperature: 0.3,
                timeout_seconds: 60,
            },
        }
    }

    #[test]
    fn builds_dummy() {
        let provider = build(&llm_config("dummy"), None).unwrap();
        assert!(matches!(provider, LlmProvider::Dummy(_)));
    }

    #[test]
    fn builds_openai_with_key() {
        let provider = build(&llm_config("openai"), Some("sk-test".into())).unwrap();
        assert!(matches!(provider, LlmProvider::OpenAiCompatible(_)));
    }

    #[test]
    fn openai_without_key_degrades_to_dummy() {
        let provider = build(&llm_config("openai"), None).unwrap();
        assert!(matches!(provider, LlmProvider::Dummy(_)));
    }

    #[test]
    fn unknown_provider_errors() {
        let err = build(&llm_config("anthropic-raw"), None).unwrap_err();
        assert!(matches!(err, ProviderError::UnknownProvider(_)));
    }
}
