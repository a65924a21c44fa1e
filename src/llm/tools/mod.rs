//! Agent工具 - 工具能力接口、注册表与按阶段划分的工具集

use anyhow::{Context, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;

pub mod file_explorer;
pub mod file_reader;
pub mod github;
pub mod readme_writer;

/// 提供给模型的工具声明
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具能力接口：按名称调用，返回字符串结果
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// 参数的 JSON Schema
    fn parameters(&self) -> Value;

    async fn call(&self, args: Map<String, Value>) -> Result<String>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// 由参数结构体生成 JSON Schema，去掉模型接口不需要的元信息
pub fn schema_of<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    schema
}

/// 将模型给出的参数反序列化为工具的参数结构体
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args))
        .with_context(|| format!("invalid arguments for {}", tool))
}

/// 工具注册表
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册全部源码探查工具
    pub fn with_source_tools(config: &Config) -> Result<Self> {
        let github = github::GitHubClient::new(config.github_token.clone())?;
        let limits = &config.tools;

        let mut registry = Self::new();
        registry.register(github::ExploreGitHubRepo::new(github.clone()));
        registry.register(github::GetGitHubRepoMetadata::new(github.clone()));
        registry.register(github::ReadGitHubFile::new(
            github,
            limits.max_remote_file_chars,
        ));
        registry.register(file_explorer::ExploreDirectory::new(limits.explore_max_depth));
        registry.register(file_reader::ReadFile::new(
            limits.max_local_lines,
            limits.max_local_file_bytes,
        ));
        registry.register(readme_writer::WriteReadme);
        Ok(registry)
    }

    pub fn register<T: AgentTool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name(), Arc::new(tool));
    }

    /// 按名称选出一个阶段可用的工具集，保持给定顺序
    pub fn scoped(&self, names: &[&str]) -> ToolSet {
        let tools = names
            .iter()
            .filter_map(|name| match self.tools.get(name) {
                Some(tool) => Some(tool.clone()),
                None => {
                    tracing::warn!(tool = %name, "tool is not registered, leaving it out of the tool set");
                    None
                }
            })
            .collect();
        ToolSet { tools }
    }
}

/// 一个阶段被允许调用的固定工具集合
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn AgentTool>>,
}

impl ToolSet {
    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|tool| tool.name() == name)
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor()).collect()
    }

    /// 调用工具，失败会转换为文本结果，不会向上抛出
    ///
    /// 名称不在集合内时返回 `None`，由调用方决定如何处理
    pub async fn invoke(&self, name: &str, args: Map<String, Value>) -> Option<String> {
        let tool = self.tools.iter().find(|tool| tool.name() == name)?;
        let output = match tool.call(args).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(tool = %name, error = %e, "tool call failed");
                format!("Error executing {}: {:#}", name, e)
            }
        };
        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// 简单的回显参数
    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoArgs {
        /// 要回显的文本
        text: String,
    }

    struct Echo;

    #[async_trait]
    impl AgentTool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo the given text"
        }

        fn parameters(&self) -> Value {
            schema_of::<EchoArgs>()
        }

        async fn call(&self, args: Map<String, Value>) -> Result<String> {
            let args: EchoArgs = parse_args(self.name(), args)?;
            Ok(args.text)
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_schema_of_strips_meta_fields() {
        let schema = schema_of::<EchoArgs>();

        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["text"].is_object());
    }

    #[test]
    fn test_scoped_keeps_requested_order_and_skips_unknown() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);

        let set = registry.scoped(&["missing", "echo"]);

        assert_eq!(set.descriptors().len(), 1);
        assert!(set.contains("echo"));
        assert!(!set.contains("missing"));
        assert_eq!(set.descriptors()[0].name, "echo");
    }

    #[tokio::test]
    async fn test_invoke_returns_tool_output() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);
        let set = registry.scoped(&["echo"]);

        let output = set.invoke("echo", args(serde_json::json!({ "text": "hi" }))).await;
        assert_eq!(output.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_invoke_converts_errors_to_text() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);
        let set = registry.scoped(&["echo"]);

        let output = set
            .invoke("echo", args(serde_json::json!({ "wrong": 1 })))
            .await
            .unwrap();
        assert!(output.starts_with("Error executing echo: invalid arguments for echo"));
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool_is_none() {
        let set = ToolRegistry::new().scoped(&[]);
        assert!(set.descriptors().is_empty());
        assert!(set.invoke("echo", Map::new()).await.is_none());
    }
}
