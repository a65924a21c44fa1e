use thiserror::Error;

use crate::generator::state::{Phase, PipelineState};
use crate::utils::prompt_loader::PromptError;

/// 引擎级错误，均为致命错误，终止本次运行
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Agent 调用失败
    #[error("{phase} agent failed at step {step}: {source:#}")]
    PhaseInvocation {
        phase: Phase,
        step: usize,
        #[source]
        source: anyhow::Error,
    },

    /// 助手请求了不属于当前阶段工具集的工具
    #[error("{phase} agent requested tool `{tool}` outside its tool set at step {step}")]
    ToolScopeViolation {
        phase: Phase,
        step: usize,
        tool: String,
    },

    /// 工具节点被调度时最后一轮没有待执行的工具请求
    #[error("{phase} tool node dispatched without pending tool calls at step {step}")]
    NoPendingToolCalls { phase: Phase, step: usize },

    /// 未在步数上限内到达终态，附带最后的状态用于诊断
    #[error("step budget of {ceiling} exhausted in {} phase", .state.active_phase)]
    StepBudgetExceeded {
        ceiling: usize,
        state: Box<PipelineState>,
    },

    /// 阶段所需的提示词模板无法解析
    #[error("{phase} prompt could not be resolved: {source}")]
    Prompt {
        phase: Phase,
        #[source]
        source: PromptError,
    },
}

impl WorkflowError {
    /// 出错时所在的阶段
    pub fn phase(&self) -> Phase {
        match self {
            WorkflowError::PhaseInvocation { phase, .. }
            | WorkflowError::ToolScopeViolation { phase, .. }
            | WorkflowError::NoPendingToolCalls { phase, .. }
            | WorkflowError::Prompt { phase, .. } => *phase,
            WorkflowError::StepBudgetExceeded { state, .. } => state.active_phase,
        }
    }
}
