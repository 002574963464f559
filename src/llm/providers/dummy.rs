//! Dummy LLM provider. Echoes input back prefixed with `[echo]`.
//! Lets the retrieval path run end to end without a real API key.

use crate::llm::{LlmResponse, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(
        &self,
        content: &str,
        _system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse {
            text: format!("[echo] {content}"),
            usage: None,
        })
    }
}
