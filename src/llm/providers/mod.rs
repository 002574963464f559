//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory, called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod openai_compatible;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and an optional API key.
///
/// `api_key` is sourced from `LLM_API_KEY` env (never TOML). The hosted
/// `openai` provider refuses to build without one; `openai-compatible`
/// allows keyless local servers.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "openai" | "openai-compatible" => {
            if config.provider == "openai" && api_key.is_none() {
                return Err(ProviderError::MissingCredential(config.provider.clone()));
            }
            let oai = &config.openai;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.temperature,
                oai.max_tokens,
                oai.timeout_seconds,
                api_key,
            )?
            .named(config.provider.as_str());
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;

    fn llm_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.into(),
            openai: OpenAiConfig {
                api_base_url: "http://127.0.0.1:9/v1/chat/completions".into(),
                model: "gpt-3.5-turbo".into(),
                temperature: 0.3,
                timeout_seconds: 1,
                max_tokens: 1000,
            },
        }
    }

    #[test]
    fn builds_dummy_without_key() {
        let p = build(&llm_config("dummy"), None).unwrap();
        assert_eq!(p.name(), "dummy");
    }

    #[test]
    fn openai_requires_key() {
        let err = build(&llm_config("openai"), None).unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential(_)));
    }

    #[test]
    fn openai_with_key_builds() {
        let p = build(&llm_config("openai"), Some("sk-test".into())).unwrap();
        assert_eq!(p.name(), "openai");
    }

    #[test]
    fn compatible_allows_keyless() {
        let p = build(&llm_config("openai-compatible"), None).unwrap();
        assert_eq!(p.name(), "openai-compatible");
    }

    #[test]
    fn unknown_provider_errors() {
        let err = build(&llm_config("mystery"), None).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }
}
