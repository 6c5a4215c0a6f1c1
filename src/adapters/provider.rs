use super::chat_completions::ChatCompletionsProvider;
use super::gemini::GeminiProvider;
use crate::config::{ProviderKind, ProviderSettings};
use crate::domain::ports::CompletionProvider;
use crate::utils::error::Result;
use async_trait::async_trait;

/// The configured completion backend.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Gemini(GeminiProvider),
    ChatCompletions(ChatCompletionsProvider),
}

impl LlmProvider {
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self> {
        tracing::info!(
            provider = %settings.kind,
            model = %settings.model,
            structured_output = settings.structured_output,
            "Configuring completion provider"
        );

        match settings.kind {
            ProviderKind::Gemini => Ok(Self::Gemini(GeminiProvider::new(settings)?)),
            ProviderKind::Groq | ProviderKind::OpenAiCompatible => Ok(Self::ChatCompletions(
                ChatCompletionsProvider::new(settings)?,
            )),
        }
    }
}

#[async_trait]
impl CompletionProvider for LlmProvider {
    fn name(&self) -> &str {
        match self {
            Self::Gemini(p) => p.name(),
            Self::ChatCompletions(p) => p.name(),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        match self {
            Self::Gemini(p) => p.complete(prompt).await,
            Self::ChatCompletions(p) => p.complete(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(kind: ProviderKind) -> ProviderSettings {
        ProviderSettings {
            kind,
            model: kind.default_model().to_string(),
            base_url: kind.default_base_url().to_string(),
            api_key: "key".to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(1),
            structured_output: true,
        }
    }

    #[test]
    fn test_provider_selection() {
        let gemini = LlmProvider::from_settings(&settings(ProviderKind::Gemini)).unwrap();
        assert!(matches!(gemini, LlmProvider::Gemini(_)));
        assert_eq!(gemini.name(), "gemini");

        let groq = LlmProvider::from_settings(&settings(ProviderKind::Groq)).unwrap();
        assert!(matches!(groq, LlmProvider::ChatCompletions(_)));
        assert_eq!(groq.name(), "groq");

        let openai = LlmProvider::from_settings(&settings(ProviderKind::OpenAiCompatible)).unwrap();
        assert_eq!(openai.name(), "openai_compatible");
    }
}
