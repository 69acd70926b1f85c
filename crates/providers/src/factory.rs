//! Build the hosted-model clients from configuration.

use std::sync::Arc;
use fitcoach_config::{AppConfig, ConfigError};
use fitcoach_core::provider::Provider;
use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::{RetryPolicy, RetryingProvider};

/// The two clients every agent roster needs, both behind the retry policy.
#[derive(Clone)]
pub struct ModelProviders {
    /// Chat completions with tool calling (coordinator, planners)
    pub chat: Arc<dyn Provider>,

    /// Search-grounded generation (search delegate)
    pub search: Arc<dyn Provider>,
}

/// Build providers from configuration.
///
/// Fails when no API key is available.
pub fn build_from_config(config: &AppConfig) -> Result<ModelProviders, ConfigError> {
    let api_key = config.require_api_key()?;
    let policy = RetryPolicy::from(&config.retry);

    let chat = match &config.api_url {
        Some(url) => OpenAiCompatProvider::new("gemini", url, api_key),
        None => OpenAiCompatProvider::gemini(api_key),
    };
    let search = GeminiProvider::new(api_key).with_search_grounding();

    tracing::debug!(
        attempts = policy.attempts,
        exp_base = policy.exp_base,
        "Built hosted-model providers"
    );

    Ok(ModelProviders {
        chat: Arc::new(RetryingProvider::new(Arc::new(chat), policy.clone())),
        search: Arc::new(RetryingProvider::new(Arc::new(search), policy)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_api_key() {
        let config = AppConfig::default();
        assert!(matches!(build_from_config(&config), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn build_with_api_key() {
        let config = AppConfig {
            api_key: Some("test-key".into()),
            ..AppConfig::default()
        };
        let providers = build_from_config(&config).unwrap();
        assert_eq!(providers.chat.name(), "gemini");
        assert_eq!(providers.search.name(), "gemini-search");
    }
}
