use anyhow::Result;
use async_trait::async_trait;

use crate::generator::state::{AssistantTurn, Phase, Turn};
use crate::llm::tools::ToolDescriptor;

pub mod client;
pub mod tools;

/// Agent调用接口：给定系统指令、会话历史与工具集，产出一个助手轮次
///
/// 实现方只负责一次模型往返，不执行任何工具调用。
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn respond(
        &self,
        phase: Phase,
        system_instruction: &str,
        history: &[Turn],
        tools: &[ToolDescriptor],
    ) -> Result<AssistantTurn>;
}
