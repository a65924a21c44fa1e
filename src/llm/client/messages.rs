//! 会话轮次与 rig 消息之间的转换

use anyhow::{Result, anyhow};
use rig::OneOrMany;
use rig::completion::{AssistantContent, Message, ToolDefinition};
use rig::message::{ToolResultContent, UserContent};
use serde_json::{Map, Value};

use crate::generator::state::{AssistantTurn, ToolCallRequest, Turn};
use crate::llm::tools::ToolDescriptor;

/// 一次补全请求的全部输入
#[derive(Debug, Clone)]
pub struct CompletionPayload {
    pub preamble: String,
    /// 会话中的最后一条消息
    pub prompt: Message,
    pub history: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl CompletionPayload {
    pub fn build(
        system_instruction: &str,
        turns: &[Turn],
        tools: &[ToolDescriptor],
        temperature: f64,
        max_tokens: u64,
    ) -> Result<Self> {
        let (preamble, mut messages) = to_rig_messages(system_instruction, turns);
        let prompt = messages
            .pop()
            .ok_or_else(|| anyhow!("cannot invoke an agent with an empty conversation"))?;

        Ok(Self {
            preamble,
            prompt,
            history: messages,
            tools: tools.iter().map(to_tool_definition).collect(),
            temperature,
            max_tokens,
        })
    }
}

pub fn to_tool_definition(descriptor: &ToolDescriptor) -> ToolDefinition {
    ToolDefinition {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        parameters: descriptor.parameters.clone(),
    }
}

/// 将会话转换为 preamble 与 rig 消息序列
///
/// rig 的消息没有 system 角色，System 轮次会并入 preamble；
/// 连续的工具结果合并成一条 User 消息。
pub fn to_rig_messages(system_instruction: &str, turns: &[Turn]) -> (String, Vec<Message>) {
    let mut preamble = system_instruction.to_string();
    let mut messages: Vec<Message> = Vec::new();
    let mut pending_results: Vec<UserContent> = Vec::new();

    for turn in turns {
        if !matches!(turn, Turn::ToolResult(_)) {
            flush_tool_results(&mut pending_results, &mut messages);
        }

        match turn {
            Turn::System { content } => {
                if !preamble.is_empty() {
                    preamble.push_str("\n\n");
                }
                preamble.push_str(content);
            }
            Turn::User { content } => messages.push(Message::user(content.clone())),
            Turn::Assistant(assistant) => messages.push(assistant_message(assistant)),
            Turn::ToolResult(result) => pending_results.push(UserContent::tool_result(
                result.call_id.clone(),
                OneOrMany::one(ToolResultContent::text(result.content.clone())),
            )),
        }
    }
    flush_tool_results(&mut pending_results, &mut messages);

    (preamble, messages)
}

fn flush_tool_results(pending: &mut Vec<UserContent>, messages: &mut Vec<Message>) {
    if pending.is_empty() {
        return;
    }
    if let Ok(content) = OneOrMany::many(std::mem::take(pending)) {
        messages.push(Message::User { content });
    }
}

fn assistant_message(turn: &AssistantTurn) -> Message {
    let mut parts = Vec::new();
    if !turn.content.is_empty() {
        parts.push(AssistantContent::text(turn.content.clone()));
    }
    for call in &turn.tool_calls {
        parts.push(AssistantContent::tool_call(
            call.id.clone(),
            call.name.clone(),
            Value::Object(call.arguments.clone()),
        ));
    }

    let content = OneOrMany::many(parts)
        .unwrap_or_else(|_| OneOrMany::one(AssistantContent::text(String::new())));
    Message::Assistant { id: None, content }
}

/// 将模型返回的内容片段整理为一个助手轮次
pub fn from_rig_choice(choice: &OneOrMany<AssistantContent>) -> AssistantTurn {
    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();

    for item in choice.iter() {
        match item {
            AssistantContent::Text(text) => {
                if !text.text.is_empty() {
                    texts.push(text.text.clone());
                }
            }
            AssistantContent::ToolCall(tool_call) => tool_calls.push(ToolCallRequest {
                id: tool_call.id.clone(),
                name: tool_call.function.name.clone(),
                arguments: arguments_map(&tool_call.function.arguments),
            }),
            _ => {}
        }
    }

    AssistantTurn::with_tool_calls(texts.join("\n"), tool_calls)
}

/// 有些 Provider 把参数当作 JSON 字符串返回
fn arguments_map(arguments: &Value) -> Map<String, Value> {
    match arguments {
        Value::Object(map) => map.clone(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}
