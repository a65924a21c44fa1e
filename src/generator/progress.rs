//! 运行进度 - 每个节点执行后发出事件，由展示层决定如何呈现

use crate::generator::state::{Phase, Turn};
use crate::generator::workflow::Node;

const BANNER_WIDTH: usize = 70;
const PREVIEW_CHARS: usize = 150;

/// 一个节点执行完成后的进度事件
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    pub step: usize,
    pub node: Node,
    pub phase: Phase,
    /// 本次节点执行追加的轮次
    pub new_turns: &'a [Turn],
}

pub trait ProgressListener: Send {
    fn on_step(&mut self, event: &ProgressEvent<'_>);
}

/// 不输出任何内容
#[derive(Debug, Default)]
pub struct SilentProgress;

impl ProgressListener for SilentProgress {
    fn on_step(&mut self, _event: &ProgressEvent<'_>) {}
}

/// 控制台进度输出
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    current_phase: Option<Phase>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成本次事件要打印的行
    fn render(&mut self, event: &ProgressEvent<'_>) -> Vec<String> {
        let mut lines = Vec::new();

        if let Node::Agent(phase) = event.node
            && self.current_phase != Some(phase)
        {
            self.current_phase = Some(phase);
            lines.push(format!(
                "\n🤖 {} AGENT ACTIVATED",
                phase.as_str().to_uppercase()
            ));
            lines.push(banner_rule());
        }

        let Some(last) = event.new_turns.last() else {
            return lines;
        };

        let (content, tool_calls) = match last {
            Turn::Assistant(turn) => (turn.content.as_str(), turn.tool_calls.as_slice()),
            Turn::ToolResult(result) => (result.content.as_str(), &[][..]),
            Turn::User { content } | Turn::System { content } => (content.as_str(), &[][..]),
        };

        if !content.is_empty() {
            if event.node == Node::Agent(Phase::Writer) {
                lines.extend(writer_summary(content));
            } else {
                lines.push(format!("{}...", preview(content)));
            }
        }

        for call in tool_calls {
            lines.push(format!("   🔧 Tool: {}", call.name));
            if call.name == "write_readme"
                && let Some(readme) = call.arguments.get("content").and_then(|v| v.as_str())
            {
                let title = if readme.contains('\n') {
                    readme.lines().next().unwrap_or("README")
                } else {
                    "README"
                };
                lines.push(format!("      Title: {}", title));
                lines.push(format!(
                    "      Stats: {} chars, {} lines",
                    readme.chars().count(),
                    readme.split('\n').count()
                ));
            }
        }

        lines
    }
}

impl ProgressListener for ConsoleProgress {
    fn on_step(&mut self, event: &ProgressEvent<'_>) {
        for line in self.render(event) {
            println!("{}", line);
        }
    }
}

fn preview(content: &str) -> String {
    content
        .chars()
        .take(PREVIEW_CHARS)
        .collect::<String>()
        .replace('\n', " ")
}

fn writer_summary(content: &str) -> Vec<String> {
    if content.chars().count() <= 200 {
        return vec![content.to_string()];
    }
    let first_line: String = if content.contains('\n') {
        content.lines().next().unwrap_or_default().to_string()
    } else {
        content.chars().take(100).collect()
    };
    vec![
        format!(" First Line: {}", first_line),
        format!(
            "   Generated {} character README with {} sections",
            content.chars().count(),
            content.matches("##").count()
        ),
    ]
}

/// 横幅分隔线
pub fn banner_rule() -> String {
    "=".repeat(BANNER_WIDTH)
}
