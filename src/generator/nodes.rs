//! 阶段节点与工具执行节点
//!
//! 节点只读取共享状态并返回增量更新，不直接修改状态。

use std::collections::HashMap;

use crate::generator::errors::WorkflowError;
use crate::generator::state::{
    Phase, PipelineState, SourceDescriptor, StateUpdate, ToolResultTurn, Turn,
};
use crate::llm::AgentInvoker;
use crate::llm::tools::ToolSet;
use crate::utils::prompt_loader::{PromptError, PromptLoader};

/// 阶段节点：组合系统指令，调用 Agent，追加一个助手轮次
pub struct PhaseNode<'a> {
    pub phase: Phase,
    pub tools: &'a ToolSet,
    pub invoker: &'a dyn AgentInvoker,
    pub prompts: &'a PromptLoader,
}

impl PhaseNode<'_> {
    pub async fn execute(&self, state: &PipelineState) -> Result<StateUpdate, WorkflowError> {
        let instruction =
            system_instruction(self.prompts, self.phase, state).map_err(|source| {
                WorkflowError::Prompt {
                    phase: self.phase,
                    source,
                }
            })?;

        let turn = self
            .invoker
            .respond(
                self.phase,
                &instruction,
                &state.conversation,
                &self.tools.descriptors(),
            )
            .await
            .map_err(|source| WorkflowError::PhaseInvocation {
                phase: self.phase,
                step: state.step_count,
                source,
            })?;

        Ok(StateUpdate::append(vec![Turn::Assistant(turn)]))
    }
}

/// 按阶段与来源类别组合系统指令
pub fn system_instruction(
    prompts: &PromptLoader,
    phase: Phase,
    state: &PipelineState,
) -> Result<String, PromptError> {
    let name = phase.as_str();
    let mut params: HashMap<&str, String> = HashMap::new();

    match phase {
        Phase::Explorer => {
            let additional = match &state.source {
                SourceDescriptor::RemoteRepository { owner, name: repo, url } => {
                    let params = HashMap::from([
                        ("OWNER", owner.clone()),
                        ("REPO", repo.clone()),
                        ("GITHUB_URL", url.clone()),
                    ]);
                    prompts.resolve(name, "github_instructions", &params)?
                }
                SourceDescriptor::LocalPath { path } => {
                    let params = HashMap::from([("PROJECT_PATH", path.display().to_string())]);
                    prompts.resolve(name, "local_instructions", &params)?
                }
            };
            params.insert("ADDITIONAL_INSTRUCTIONS", additional);
        }
        Phase::Analyzer => {
            let read_instructions = match &state.source {
                SourceDescriptor::RemoteRepository { owner, name: repo, .. } => {
                    let params =
                        HashMap::from([("OWNER", owner.clone()), ("REPO", repo.clone())]);
                    prompts.resolve(name, "read_github", &params)?
                }
                SourceDescriptor::LocalPath { .. } => {
                    prompts.resolve(name, "read_local", &HashMap::new())?
                }
            };
            params.insert("FILE_READ_INSTRUCTIONS", read_instructions);
        }
        Phase::Writer => {
            let github_context = match &state.source {
                SourceDescriptor::RemoteRepository { .. } => {
                    prompts.resolve(name, "github_context", &HashMap::new())?
                }
                SourceDescriptor::LocalPath { .. } => String::new(),
            };
            let example = match &state.style_example {
                Some(example) => {
                    let params = HashMap::from([("EXAMPLE_README", example.clone())]);
                    prompts.resolve(name, "example_readme", &params)?
                }
                None => String::new(),
            };
            params.insert("GITHUB_CONTEXT", github_context);
            params.insert("EXAMPLE_README", example);
            params.insert("OUTPUT_PATH", state.output_location.display().to_string());
        }
    }

    prompts.resolve(name, "base", &params)
}

/// 工具执行节点：按请求顺序逐个执行，每个请求对应一个结果轮次
pub struct ToolNode<'a> {
    pub phase: Phase,
    pub tools: &'a ToolSet,
}

impl ToolNode<'_> {
    pub async fn execute(&self, state: &PipelineState) -> Result<StateUpdate, WorkflowError> {
        let Some(assistant) = state
            .last_assistant_turn()
            .filter(|turn| turn.has_tool_calls())
        else {
            return Err(WorkflowError::NoPendingToolCalls {
                phase: self.phase,
                step: state.step_count,
            });
        };

        // 任何一个越界请求都使整批请求失效，不执行其中任何工具
        if let Some(call) = assistant
            .tool_calls
            .iter()
            .find(|call| !self.tools.contains(&call.name))
        {
            return Err(WorkflowError::ToolScopeViolation {
                phase: self.phase,
                step: state.step_count,
                tool: call.name.clone(),
            });
        }

        let mut results = Vec::with_capacity(assistant.tool_calls.len());
        for call in &assistant.tool_calls {
            tracing::info!(phase = %self.phase, tool = %call.name, "executing tool");
            let content = self
                .tools
                .invoke(&call.name, call.arguments.clone())
                .await
                .unwrap_or_else(|| format!("Error: tool {} is not available", call.name));
            results.push(Turn::ToolResult(ToolResultTurn {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                content,
            }));
        }

        Ok(StateUpdate::append(results))
    }
}
