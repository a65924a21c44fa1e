use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::llm::AgentInvoker;
use crate::llm::client::LLMClient;
use crate::llm::tools::ToolRegistry;
use crate::utils::prompt_loader::PromptLoader;

#[derive(Clone)]
pub struct GeneratorContext {
    /// Agent调用器，用于与AI通信。
    pub invoker: Arc<dyn AgentInvoker>,
    /// 全部可用工具，按阶段再划分工具集
    pub registry: ToolRegistry,
    /// 提示词模板
    pub prompts: PromptLoader,
    /// 配置
    pub config: Config,
}

impl GeneratorContext {
    /// 创建新的生成器上下文
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(&config.llm)?;
        Self::with_invoker(config, Arc::new(llm_client))
    }

    /// 使用指定的Agent调用器创建上下文
    pub fn with_invoker(config: Config, invoker: Arc<dyn AgentInvoker>) -> Result<Self> {
        let registry = ToolRegistry::with_source_tools(&config)?;
        let prompts = PromptLoader::new(config.prompts_dir.clone());

        Ok(Self {
            invoker,
            registry,
            prompts,
            config,
        })
    }
}
