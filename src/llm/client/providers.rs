//! LLM Provider支持模块

use anyhow::Result;
use rig::OneOrMany;
use rig::client::CompletionClient;
use rig::completion::{AssistantContent, CompletionModel};

use super::messages::CompletionPayload;
use crate::config::{LLMConfig, LLMProvider};

/// 统一的Provider客户端枚举
#[derive(Clone)]
pub enum ProviderClient {
    /// OpenAI 以及兼容 Chat Completions 接口的服务（Groq）
    OpenAI(rig::providers::openai::Client),
    DeepSeek(rig::providers::deepseek::Client),
    Mistral(rig::providers::mistral::Client),
    OpenRouter(rig::providers::openrouter::Client),
    Anthropic(rig::providers::anthropic::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    /// 根据配置创建相应的provider客户端
    pub fn new(config: &LLMConfig, api_key: &str) -> Result<Self> {
        let base_url = config.base_url();
        match config.provider {
            LLMProvider::OpenAI | LLMProvider::Groq => {
                let client = rig::providers::openai::Client::builder(api_key)
                    .base_url(&base_url)
                    .build();
                Ok(ProviderClient::OpenAI(client))
            }
            LLMProvider::DeepSeek => {
                let client = rig::providers::deepseek::Client::builder(api_key)
                    .base_url(&base_url)
                    .build();
                Ok(ProviderClient::DeepSeek(client))
            }
            LLMProvider::Mistral => {
                let client = rig::providers::mistral::Client::builder(api_key)
                    .base_url(&base_url)
                    .build();
                Ok(ProviderClient::Mistral(client))
            }
            LLMProvider::OpenRouter => {
                let client = rig::providers::openrouter::Client::builder(api_key)
                    .base_url(&base_url)
                    .build();
                Ok(ProviderClient::OpenRouter(client))
            }
            LLMProvider::Anthropic => {
                let client = rig::providers::anthropic::ClientBuilder::new(api_key)
                    .base_url(&base_url)
                    .build()?;
                Ok(ProviderClient::Anthropic(client))
            }
            LLMProvider::Ollama => {
                let client = rig::providers::ollama::Client::builder()
                    .base_url(&base_url)
                    .build();
                Ok(ProviderClient::Ollama(client))
            }
        }
    }

    /// 发送一次补全请求，返回模型产出的内容片段
    pub async fn complete(
        &self,
        model: &str,
        payload: CompletionPayload,
    ) -> Result<OneOrMany<AssistantContent>> {
        match self {
            ProviderClient::OpenAI(client) => {
                send_completion(client.completion_model(model).completions_api(), payload).await
            }
            ProviderClient::DeepSeek(client) => {
                send_completion(client.completion_model(model), payload).await
            }
            ProviderClient::Mistral(client) => {
                send_completion(client.completion_model(model), payload).await
            }
            ProviderClient::OpenRouter(client) => {
                send_completion(client.completion_model(model), payload).await
            }
            ProviderClient::Anthropic(client) => {
                send_completion(client.completion_model(model), payload).await
            }
            ProviderClient::Ollama(client) => {
                send_completion(client.completion_model(model), payload).await
            }
        }
    }
}

async fn send_completion<M: CompletionModel>(
    model: M,
    payload: CompletionPayload,
) -> Result<OneOrMany<AssistantContent>> {
    let response = model
        .completion_request(payload.prompt)
        .preamble(payload.preamble)
        .messages(payload.history)
        .tools(payload.tools)
        .temperature(payload.temperature)
        .max_tokens(payload.max_tokens)
        .send()
        .await?;
    Ok(response.choice)
}
