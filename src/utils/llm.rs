//! LLM capabilities and configuration.
//!
//! [Generate] is what retrieval-augmented answering and conversations call: one `(context, question)` pair in,
//! one answer out. [Complete] is the lower level chat completion that [crate::signature::Predict] drives.
//!
//! There is no global LLM configuration. Build an [LlmConfig] once, e.g. via [LlmConfig::from_env], and hand it to
//! every [openai::LlmClient] that needs it.

use std::env;
use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::error::RagError;

pub mod openai;

pub const AZURE_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const AZURE_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const AZURE_OPENAI_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const AZURE_OPENAI_DEPLOYMENT_NAME: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-35-turbo";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u16 = 1000;

/// Produces an answer for a question given some context text.
///
/// Implementations may block for a network round trip and may fail with any provider error.
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, context: &str, question: &str) -> Result<String>;
}

#[async_trait]
impl<G: Generate + ?Sized> Generate for &G {
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        (**self).generate(context, question).await
    }
}

/// A chat prompt made of a system message and a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// Sends a chat prompt to an LLM and returns the text of its reply.
#[async_trait]
pub trait Complete: Send + Sync {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String>;
}

#[async_trait]
impl<C: Complete + ?Sized> Complete for &C {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        (**self).complete(prompt).await
    }
}

/// Which OpenAI-compatible provider to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Azure {
        api_key: String,
        endpoint: Url,
        api_version: String,
        deployment: String,
    },
    OpenAI {
        api_key: String,
        model: String,
    },
}

impl Provider {
    /// Short provider name for display.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Azure { .. } => "azure",
            Provider::OpenAI { .. } => "openai",
        }
    }

    /// Model name, the deployment name for Azure.
    pub fn model(&self) -> &str {
        match self {
            Provider::Azure { deployment, .. } => deployment,
            Provider::OpenAI { model, .. } => model,
        }
    }
}

/// Configuration of the LLM endpoint used by [openai::LlmClient].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: Provider,
    pub max_tokens: u16,
}

impl LlmConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u16) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Resolve the provider from the process environment, preferring Azure OpenAI over OpenAI.
    pub fn from_env() -> std::result::Result<Self, RagError> {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Like [LlmConfig::from_env] with an explicit variable lookup. Empty values count as unset.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> std::result::Result<Self, RagError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let provider = match (var(AZURE_OPENAI_API_KEY), var(AZURE_OPENAI_ENDPOINT), var(OPENAI_API_KEY)) {
            (Some(api_key), Some(endpoint), _) => {
                let endpoint = Url::parse(&endpoint)
                    .map_err(|e| RagError::Config(format!("{} = {:?} is not a valid url: {}", AZURE_OPENAI_ENDPOINT, endpoint, e)))?;
                Provider::Azure {
                    api_key,
                    endpoint,
                    api_version: var(AZURE_OPENAI_API_VERSION).unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
                    deployment: var(AZURE_OPENAI_DEPLOYMENT_NAME).unwrap_or_else(|| DEFAULT_AZURE_DEPLOYMENT.to_string()),
                }
            }
            (_, _, Some(api_key)) => Provider::OpenAI {
                api_key,
                model: DEFAULT_OPENAI_MODEL.to_string(),
            },
            _ => return Err(RagError::MissingCredentials),
        };
        Ok(Self::new(provider))
    }
}

#[cfg(test)]
mod test_llm_config {
    use std::collections::HashMap;
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_azure_preferred() {
        let config = LlmConfig::from_env_with(lookup(&[
            (AZURE_OPENAI_API_KEY, "azure-key"),
            (AZURE_OPENAI_ENDPOINT, "https://my-resource.openai.azure.com/"),
            (OPENAI_API_KEY, "openai-key"),
        ])).unwrap();
        assert_eq!(DEFAULT_MAX_TOKENS, config.max_tokens);
        match config.provider {
            Provider::Azure { api_key, endpoint, api_version, deployment } => {
                assert_eq!("azure-key", api_key);
                assert_eq!("my-resource.openai.azure.com", endpoint.host_str().unwrap());
                assert_eq!(DEFAULT_AZURE_API_VERSION, api_version);
                assert_eq!(DEFAULT_AZURE_DEPLOYMENT, deployment);
            }
            other => panic!("expected azure, got {:?}", other),
        }
    }

    #[test]
    fn test_azure_overrides() {
        let config = LlmConfig::from_env_with(lookup(&[
            (AZURE_OPENAI_API_KEY, "azure-key"),
            (AZURE_OPENAI_ENDPOINT, "https://my-resource.openai.azure.com/"),
            (AZURE_OPENAI_API_VERSION, "2024-06-01"),
            (AZURE_OPENAI_DEPLOYMENT_NAME, "gpt-4"),
        ])).unwrap().with_max_tokens(500);
        assert_eq!(500, config.max_tokens);
        assert_eq!("gpt-4", config.provider.model());
        assert_eq!("azure", config.provider.name());
    }

    #[test]
    fn test_openai_fallback() {
        let config = LlmConfig::from_env_with(lookup(&[
            (AZURE_OPENAI_API_KEY, "azure-key-without-endpoint"),
            (OPENAI_API_KEY, "openai-key"),
        ])).unwrap();
        assert_eq!(Provider::OpenAI { api_key: "openai-key".to_string(), model: DEFAULT_OPENAI_MODEL.to_string() }, config.provider);
    }

    #[test]
    fn test_missing_credentials() {
        let error = LlmConfig::from_env_with(lookup(&[(OPENAI_API_KEY, "  ")])).unwrap_err();
        assert!(matches!(error, RagError::MissingCredentials));
    }

    #[test]
    fn test_bad_endpoint() {
        let error = LlmConfig::from_env_with(lookup(&[
            (AZURE_OPENAI_API_KEY, "azure-key"),
            (AZURE_OPENAI_ENDPOINT, "not a url"),
        ])).unwrap_err();
        assert!(matches!(error, RagError::Config(_)));
    }
}
