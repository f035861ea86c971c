use anyhow::Result;
use async_openai::Client;
use async_openai::config::{AzureConfig, OpenAIConfig};
use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use log::{debug, warn};

use crate::utils::llm::{ChatPrompt, Complete, LlmConfig, Provider};

/// The underlying async-openai client for either provider.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    Azure(Client<AzureConfig>),
    OpenAI(Client<OpenAIConfig>),
}

/// Chat completion client for OpenAI or Azure OpenAI, built from an [LlmConfig].
#[derive(Debug, Clone)]
pub struct LlmClient {
    pub client: ProviderClient,
    pub model: String,
    pub max_tokens: u16,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Self {
        let client = match &config.provider {
            Provider::Azure { api_key, endpoint, api_version, deployment } => {
                let azure_config = AzureConfig::new()
                    .with_api_base(endpoint.as_str().trim_end_matches('/'))
                    .with_api_key(api_key)
                    .with_api_version(api_version)
                    .with_deployment_id(deployment);
                ProviderClient::Azure(Client::with_config(azure_config))
            }
            Provider::OpenAI { api_key, .. } => {
                ProviderClient::OpenAI(Client::with_config(OpenAIConfig::new().with_api_key(api_key)))
            }
        };
        Self {
            client,
            model: config.provider.model().to_string(),
            max_tokens: config.max_tokens,
        }
    }

    /// Build the chat completion request for a prompt.
    pub fn build_request(&self, prompt: &ChatPrompt) -> Result<CreateChatCompletionRequest> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if !prompt.system.is_empty() {
            messages.push(ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system.as_str())
                .build()?
                .into());
        }
        messages.push(ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user.as_str())
            .build()?
            .into());
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .max_tokens(self.max_tokens)
            .messages(messages)
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl Complete for LlmClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let request = self.build_request(prompt)?;
        debug!("sending chat completion request to {} with {} messages", self.model, request.messages.len());
        let response = match &self.client {
            ProviderClient::Azure(client) => client.chat().create(request).await?,
            ProviderClient::OpenAI(client) => client.chat().create(request).await?,
        };
        if let Some(usage) = &response.usage {
            debug!("token usage: prompt = {}, completion = {}", usage.prompt_tokens, usage.completion_tokens);
        }
        let content = response.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        match content {
            Some(content) => Ok(content),
            None => {
                warn!("the reply from {} has no content", self.model);
                Ok(String::new())
            }
        }
    }
}
