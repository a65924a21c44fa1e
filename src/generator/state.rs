//! 流水线共享状态 - 会话轮次、数据源描述与阶段标识

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// 流水线阶段，按 Explorer → Analyzer → Writer 的固定顺序推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Explorer,
    Analyzer,
    Writer,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Explorer, Phase::Analyzer, Phase::Writer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Explorer => "explorer",
            Phase::Analyzer => "analyzer",
            Phase::Writer => "writer",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 模型发起的一次工具调用请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// 调用标识，工具结果轮次通过它与请求关联
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// 助手轮次：文本和/或有序的工具调用请求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AssistantTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// 工具结果轮次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultTurn {
    /// 对应 [`ToolCallRequest::id`]
    pub call_id: String,
    pub tool_name: String,
    pub content: String,
}

/// 会话中的一个轮次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User { content: String },
    /// 只存在于单次阶段调用内，不写入共享会话
    System { content: String },
    Assistant(AssistantTurn),
    ToolResult(ToolResultTurn),
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Turn::System {
            content: content.into(),
        }
    }

    /// 文本长度，用于运行结束时的规模统计
    pub fn char_len(&self) -> usize {
        match self {
            Turn::User { content } | Turn::System { content } => content.chars().count(),
            Turn::Assistant(turn) => turn.content.chars().count(),
            Turn::ToolResult(result) => result.content.chars().count(),
        }
    }
}

/// 项目来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    RemoteRepository {
        owner: String,
        name: String,
        url: String,
    },
    LocalPath {
        path: PathBuf,
    },
}

/// 来源类别，决定每个阶段使用的工具集与提示词变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Remote,
    Local,
}

impl SourceDescriptor {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceDescriptor::RemoteRepository { .. } => SourceKind::Remote,
            SourceDescriptor::LocalPath { .. } => SourceKind::Local,
        }
    }

    /// 面向用户的来源描述（URL 或本地路径）
    pub fn describe(&self) -> String {
        match self {
            SourceDescriptor::RemoteRepository { url, .. } => url.clone(),
            SourceDescriptor::LocalPath { path } => path.display().to_string(),
        }
    }
}

/// 节点执行后返回的增量更新，合并规则为追加
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub appended: Vec<Turn>,
}

impl StateUpdate {
    pub fn append(turns: Vec<Turn>) -> Self {
        Self { appended: turns }
    }
}

/// 贯穿所有节点的共享状态，每次运行独立创建
#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    pub conversation: Vec<Turn>,
    pub source: SourceDescriptor,
    pub style_example: Option<String>,
    pub output_location: PathBuf,
    pub active_phase: Phase,
    pub step_count: usize,
}

impl PipelineState {
    pub fn new(
        source: SourceDescriptor,
        output_location: PathBuf,
        style_example: Option<String>,
    ) -> Self {
        let request = Turn::user(format!(
            "Generate a comprehensive README for: {}",
            source.describe()
        ));
        Self {
            conversation: vec![request],
            source,
            style_example,
            output_location,
            active_phase: Phase::Explorer,
            step_count: 0,
        }
    }

    /// 合并节点返回的更新，只追加不替换
    pub fn apply(&mut self, update: StateUpdate) {
        self.conversation.extend(update.appended);
    }

    /// 由引擎在分派阶段节点前调用；阶段只能前进
    pub(crate) fn enter_phase(&mut self, phase: Phase) {
        debug_assert!(phase >= self.active_phase, "phase must never regress");
        self.active_phase = phase;
    }

    pub fn last_assistant_turn(&self) -> Option<&AssistantTurn> {
        match self.conversation.last() {
            Some(Turn::Assistant(turn)) => Some(turn),
            _ => None,
        }
    }

    pub fn total_chars(&self) -> usize {
        self.conversation.iter().map(Turn::char_len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_state() -> PipelineState {
        PipelineState::new(
            SourceDescriptor::LocalPath {
                path: PathBuf::from("/proj"),
            },
            PathBuf::from("."),
            None,
        )
    }

    #[test]
    fn test_initial_state_has_single_user_request() {
        let state = local_state();

        assert_eq!(state.conversation.len(), 1);
        assert_eq!(
            state.conversation[0],
            Turn::user("Generate a comprehensive README for: /proj")
        );
        assert_eq!(state.active_phase, Phase::Explorer);
        assert_eq!(state.step_count, 0);
    }

    #[test]
    fn test_apply_appends_in_order() {
        let mut state = local_state();
        state.apply(StateUpdate::append(vec![
            Turn::Assistant(AssistantTurn::text("a")),
            Turn::Assistant(AssistantTurn::text("b")),
        ]));
        state.apply(StateUpdate::default());

        assert_eq!(state.conversation.len(), 3);
        assert_eq!(state.conversation[2], Turn::Assistant(AssistantTurn::text("b")));
        assert_eq!(state.last_assistant_turn(), Some(&AssistantTurn::text("b")));
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::Explorer < Phase::Analyzer);
        assert!(Phase::Analyzer < Phase::Writer);
        assert_eq!(Phase::Writer.to_string(), "writer");
    }

    #[test]
    fn test_remote_source_describe_uses_url() {
        let source = SourceDescriptor::RemoteRepository {
            owner: "acme".to_string(),
            name: "widget".to_string(),
            url: "https://github.com/acme/widget".to_string(),
        };

        assert_eq!(source.kind(), SourceKind::Remote);
        assert_eq!(source.describe(), "https://github.com/acme/widget");
    }

    #[test]
    fn test_turn_serializes_with_role_tag() {
        let value = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hi");
    }
}
