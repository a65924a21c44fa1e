//! LLM客户端 - 基于 rig 的 Agent 调用实现

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::generator::state::{AssistantTurn, Phase, Turn};
use crate::llm::AgentInvoker;
use crate::llm::tools::ToolDescriptor;

pub mod messages;
mod providers;

use messages::{CompletionPayload, from_rig_choice};
use providers::ProviderClient;

/// LLM客户端 - 每次调用对应一次模型往返
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    model: String,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端，缺少 API KEY 时立即失败
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let client = ProviderClient::new(config, &api_key)?;
        Ok(Self {
            config: config.clone(),
            model: config.model_name(),
            client,
        })
    }

    /// 通用重试逻辑，每次尝试都受超时限制
    async fn retry_with_backoff<T, F, Fut>(&self, phase: Phase, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let mut retries = 0;

        loop {
            let outcome = match tokio::time::timeout(timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!(
                    "model call timed out after {}s",
                    self.config.timeout_seconds
                )),
            };

            match outcome {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    tracing::warn!(
                        %phase,
                        attempt = retries,
                        max_attempts = max_retries,
                        "model call failed: {err:#}"
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl AgentInvoker for LLMClient {
    async fn respond(
        &self,
        phase: Phase,
        system_instruction: &str,
        history: &[Turn],
        tools: &[ToolDescriptor],
    ) -> Result<AssistantTurn> {
        let payload = CompletionPayload::build(
            system_instruction,
            history,
            tools,
            self.config.temperature,
            self.config.max_tokens,
        )?;

        tracing::debug!(
            %phase,
            model = %self.model,
            history = payload.history.len() + 1,
            tools = payload.tools.len(),
            "invoking agent"
        );

        let choice = self
            .retry_with_backoff(phase, || {
                self.client.complete(&self.model, payload.clone())
            })
            .await?;

        let turn = from_rig_choice(&choice);
        tracing::debug!(
            %phase,
            chars = turn.content.chars().count(),
            tool_calls = turn.tool_calls.len(),
            "agent responded"
        );
        Ok(turn)
    }
}
