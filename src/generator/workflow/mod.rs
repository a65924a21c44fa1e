use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::generator::context::GeneratorContext;
use crate::generator::errors::WorkflowError;
use crate::generator::nodes::{PhaseNode, ToolNode};
use crate::generator::progress::{ConsoleProgress, ProgressEvent, ProgressListener, banner_rule};
use crate::generator::state::{Phase, PipelineState, SourceDescriptor, SourceKind, Turn};
use crate::llm::AgentInvoker;
use crate::llm::tools::readme_writer::readme_destination;
use crate::llm::tools::{ToolRegistry, ToolSet};
use crate::utils::github_url::parse_source;
use crate::utils::prompt_loader::PromptLoader;

/// 单个阶段的路由信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSpec {
    pub phase: Phase,
    pub remote_tools: &'static [&'static str],
    pub local_tools: &'static [&'static str],
    pub successor: Option<Phase>,
}

/// 不可变的路由表，所有运行共享
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGraph {
    phases: [PhaseSpec; 3],
}

pub static README_WORKFLOW: WorkflowGraph = WorkflowGraph::standard();

impl WorkflowGraph {
    pub const fn standard() -> Self {
        Self {
            phases: [
                PhaseSpec {
                    phase: Phase::Explorer,
                    remote_tools: &["explore_github_repo", "get_github_repo_metadata"],
                    local_tools: &["explore_directory"],
                    successor: Some(Phase::Analyzer),
                },
                PhaseSpec {
                    phase: Phase::Analyzer,
                    remote_tools: &["read_github_file"],
                    local_tools: &["read_file"],
                    successor: Some(Phase::Writer),
                },
                PhaseSpec {
                    phase: Phase::Writer,
                    remote_tools: &["write_readme"],
                    local_tools: &["write_readme"],
                    successor: None,
                },
            ],
        }
    }

    pub fn entry(&self) -> Node {
        Node::Agent(self.phases[0].phase)
    }

    pub fn spec(&self, phase: Phase) -> &PhaseSpec {
        &self.phases[phase as usize]
    }

    pub fn tool_names(&self, phase: Phase, kind: SourceKind) -> &'static [&'static str] {
        let spec = self.spec(phase);
        match kind {
            SourceKind::Remote => spec.remote_tools,
            SourceKind::Local => spec.local_tools,
        }
    }

    /// 节点执行完成后的下一个节点
    pub fn transition(&self, node: Node, conversation: &[Turn]) -> Node {
        match node {
            Node::Agent(phase) => match tools_condition(conversation) {
                Route::Tools => Node::Tools(phase),
                Route::End => self
                    .spec(phase)
                    .successor
                    .map(Node::Agent)
                    .unwrap_or(Node::Done),
            },
            Node::Tools(phase) => Node::Agent(phase),
            Node::Done => Node::Done,
        }
    }
}

/// 阶段节点之后的路由结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tools,
    End,
}

/// 最后一个轮次是带工具调用的助手轮次时进入工具循环，否则结束当前阶段
pub fn tools_condition(conversation: &[Turn]) -> Route {
    match conversation.last() {
        Some(Turn::Assistant(turn)) if turn.has_tool_calls() => Route::Tools,
        _ => Route::End,
    }
}

/// 状态机中的节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Agent(Phase),
    Tools(Phase),
    Done,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Agent(phase) => write!(f, "{}", phase),
            Node::Tools(phase) => write!(f, "{}_tools", phase),
            Node::Done => f.write_str("done"),
        }
    }
}

/// 一次运行的输入
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source: SourceDescriptor,
    pub output_location: PathBuf,
    pub style_example: Option<String>,
    pub step_ceiling: usize,
}

/// 编排引擎
#[derive(Clone)]
pub struct Engine {
    graph: &'static WorkflowGraph,
    invoker: Arc<dyn AgentInvoker>,
    registry: ToolRegistry,
    prompts: PromptLoader,
}

impl Engine {
    pub fn new(
        invoker: Arc<dyn AgentInvoker>,
        registry: ToolRegistry,
        prompts: PromptLoader,
    ) -> Self {
        Self {
            graph: &README_WORKFLOW,
            invoker,
            registry,
            prompts,
        }
    }

    pub fn from_context(context: &GeneratorContext) -> Self {
        Self::new(
            context.invoker.clone(),
            context.registry.clone(),
            context.prompts.clone(),
        )
    }

    /// 从初始状态驱动到终态或失败
    pub async fn run(
        &self,
        request: RunRequest,
        progress: &mut dyn ProgressListener,
    ) -> Result<PipelineState, WorkflowError> {
        let RunRequest {
            source,
            output_location,
            style_example,
            step_ceiling,
        } = request;

        let mut state = PipelineState::new(source, output_location, style_example);

        // 工具集在运行开始时按来源类别确定，运行期间不再变化
        let kind = state.source.kind();
        let tool_sets: [ToolSet; 3] =
            Phase::ALL.map(|phase| self.registry.scoped(self.graph.tool_names(phase, kind)));

        tracing::info!(source = %state.source.describe(), step_ceiling, "starting workflow run");

        let mut node = self.graph.entry();
        while node != Node::Done {
            if state.step_count >= step_ceiling {
                tracing::warn!(
                    step_ceiling,
                    phase = %state.active_phase,
                    "step budget exhausted"
                );
                return Err(WorkflowError::StepBudgetExceeded {
                    ceiling: step_ceiling,
                    state: Box::new(state),
                });
            }

            if let Node::Agent(phase) = node {
                if state.step_count == 0 || phase != state.active_phase {
                    tracing::info!(%phase, "entering phase");
                }
                state.enter_phase(phase);
            }
            state.step_count += 1;
            tracing::debug!(step = state.step_count, %node, "dispatching node");

            let update = match node {
                Node::Agent(phase) => {
                    let phase_node = PhaseNode {
                        phase,
                        tools: &tool_sets[phase as usize],
                        invoker: self.invoker.as_ref(),
                        prompts: &self.prompts,
                    };
                    phase_node.execute(&state).await?
                }
                Node::Tools(phase) => {
                    let tool_node = ToolNode {
                        phase,
                        tools: &tool_sets[phase as usize],
                    };
                    tool_node.execute(&state).await?
                }
                Node::Done => break,
            };

            let appended_from = state.conversation.len();
            state.apply(update);
            progress.on_step(&ProgressEvent {
                step: state.step_count,
                node,
                phase: state.active_phase,
                new_turns: &state.conversation[appended_from..],
            });

            node = self.graph.transition(node, &state.conversation);
        }

        tracing::info!(
            steps = state.step_count,
            turns = state.conversation.len(),
            "workflow run completed"
        );
        Ok(state)
    }
}

/// 读取风格参考README；读取失败不终止运行
fn load_style_example(path: Option<&std::path::Path>) -> Option<String> {
    let path = path?;
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "style example could not be loaded");
            println!("⚠️ Could not load example: {}", e);
            None
        }
    }
}

/// 启动README生成工作流
pub async fn launch(config: &Config) -> Result<()> {
    let source = parse_source(&config.repo)?;
    if let SourceDescriptor::RemoteRepository { owner, name, .. } = &source {
        println!("📦 GitHub Repository: {}/{}", owner, name);
    }
    let style_example = load_style_example(config.example_path.as_deref());

    let context = GeneratorContext::new(config.clone())?;
    let engine = Engine::from_context(&context);

    println!(
        "\n> Starting README Generation using {}...",
        config.llm.provider.to_string().to_uppercase()
    );
    println!("{}", banner_rule());

    let request = RunRequest {
        source,
        output_location: config.output_path.clone(),
        style_example,
        step_ceiling: config.recursion_limit,
    };

    let mut console = ConsoleProgress::new();
    match engine.run(request, &mut console).await {
        Ok(state) => {
            println!("\n{}\n✨ README Generation Complete!", banner_rule());
            print_summary(&state);
            Ok(())
        }
        Err(err) => {
            eprintln!(
                "\n❌ README generation failed in {} phase: {}",
                err.phase(),
                err
            );
            Err(err.into())
        }
    }
}

fn print_summary(state: &PipelineState) {
    let readme = readme_destination(&state.output_location);
    if readme.is_file() {
        println!("📄 README: {}", readme.display());
    } else {
        println!("⚠️ No README was written to {}", readme.display());
    }
    println!(
        "📊 {} steps, {} turns, {} chars",
        state.step_count,
        state.conversation.len(),
        state.total_chars()
    );
}
