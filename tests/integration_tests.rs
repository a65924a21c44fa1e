use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use repo_scribe::config::Config;
use repo_scribe::generator::context::GeneratorContext;
use repo_scribe::generator::progress::SilentProgress;
use repo_scribe::generator::state::{
    AssistantTurn, Phase, SourceDescriptor, ToolCallRequest, Turn,
};
use repo_scribe::generator::workflow::{Engine, RunRequest};
use repo_scribe::llm::AgentInvoker;
use repo_scribe::llm::tools::ToolDescriptor;
use repo_scribe::utils::github_url::parse_source;

/// 创建一个简单的测试项目
fn create_test_project(dir: &Path) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::create_dir_all(dir.join("node_modules/left-pad")).unwrap();

    let cargo_toml = r#"[package]
name = "test-project"
version = "0.1.0"
edition = "2021"

[dependencies]
serde = "1.0"
"#;
    fs::write(dir.join("Cargo.toml"), cargo_toml).unwrap();
    fs::write(
        dir.join("src/main.rs"),
        "fn main() {\n    println!(\"hello\");\n}\n",
    )
    .unwrap();
    fs::write(dir.join("node_modules/left-pad/index.js"), "module.exports = 1;").unwrap();
}

fn call(id: &str, name: &str, args: Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args.as_object().cloned().unwrap_or_default(),
    }
}

/// 按调用顺序回放的Agent
struct Replay {
    turns: Mutex<VecDeque<(Phase, AssistantTurn)>>,
}

impl Replay {
    fn new(turns: Vec<(Phase, AssistantTurn)>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
        }
    }
}

#[async_trait]
impl AgentInvoker for Replay {
    async fn respond(
        &self,
        phase: Phase,
        _system_instruction: &str,
        _history: &[Turn],
        tools: &[ToolDescriptor],
    ) -> Result<AssistantTurn> {
        assert!(!tools.is_empty(), "{phase} received no tools");
        let (expected, turn) = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((phase, AssistantTurn::text("nothing left to do")));
        assert_eq!(expected, phase);
        Ok(turn)
    }
}

fn tool_results(turns: &[Turn]) -> Vec<(String, String)> {
    turns
        .iter()
        .filter_map(|turn| match turn {
            Turn::ToolResult(result) => Some((result.tool_name.clone(), result.content.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_local_project_readme_generation() {
    let project = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    create_test_project(project.path());

    let project_path = project.path().to_string_lossy().to_string();
    let output_path = output.path().to_string_lossy().to_string();
    let readme = "# test-project\n\n## Usage\n\n```\ncargo run\n```\n";

    let invoker = Arc::new(Replay::new(vec![
        (
            Phase::Explorer,
            AssistantTurn::with_tool_calls(
                "",
                vec![call("e1", "explore_directory", json!({ "path": project_path }))],
            ),
        ),
        (Phase::Explorer, AssistantTurn::text("A small Rust binary.")),
        (
            Phase::Analyzer,
            AssistantTurn::with_tool_calls(
                "reading manifest",
                vec![
                    call(
                        "a1",
                        "read_file",
                        json!({ "filepath": project.path().join("Cargo.toml") }),
                    ),
                    call(
                        "a2",
                        "read_file",
                        json!({ "filepath": project.path().join("missing.rs") }),
                    ),
                ],
            ),
        ),
        (Phase::Analyzer, AssistantTurn::text("Uses serde.")),
        (
            Phase::Writer,
            AssistantTurn::with_tool_calls(
                "",
                vec![call(
                    "w1",
                    "write_readme",
                    json!({ "content": readme, "output_path": output_path }),
                )],
            ),
        ),
        (Phase::Writer, AssistantTurn::text("README written.")),
    ]));

    let config = Config {
        repo: project_path.clone(),
        output_path: output.path().to_path_buf(),
        ..Default::default()
    };
    let context = GeneratorContext::with_invoker(config.clone(), invoker).unwrap();
    let engine = Engine::from_context(&context);

    let request = RunRequest {
        source: parse_source(&config.repo).unwrap(),
        output_location: config.output_path.clone(),
        style_example: None,
        step_ceiling: config.recursion_limit,
    };
    let state = engine.run(request, &mut SilentProgress).await.unwrap();

    assert_eq!(state.step_count, 9);
    assert_eq!(state.active_phase, Phase::Writer);
    assert!(matches!(state.source, SourceDescriptor::LocalPath { .. }));

    let written = fs::read_to_string(output.path().join("README.md")).unwrap();
    assert_eq!(written, readme);

    let results = tool_results(&state.conversation);
    assert_eq!(results.len(), 4);

    let (name, tree) = &results[0];
    assert_eq!(name, "explore_directory");
    assert!(tree.contains("Cargo.toml"));
    assert!(tree.contains("main.rs"));
    assert!(!tree.contains("node_modules"));

    assert!(results[1].1.contains("name = \"test-project\""));
    assert!(results[2].1.starts_with("Error: File not found"));
    assert!(results[3].1.starts_with("Successfully wrote README to"));
}

#[tokio::test]
async fn test_step_budget_keeps_partial_conversation() {
    let project = TempDir::new().unwrap();
    create_test_project(project.path());
    let project_path = project.path().to_string_lossy().to_string();

    let looping: Vec<(Phase, AssistantTurn)> = (0..10)
        .map(|i| {
            (
                Phase::Explorer,
                AssistantTurn::with_tool_calls(
                    "",
                    vec![call(
                        &format!("e{i}"),
                        "explore_directory",
                        json!({ "path": project_path, "max_depth": 1 }),
                    )],
                ),
            )
        })
        .collect();

    let config = Config {
        repo: project_path.clone(),
        recursion_limit: 4,
        ..Default::default()
    };
    let context = GeneratorContext::with_invoker(config.clone(), Arc::new(Replay::new(looping)))
        .unwrap();

    let request = RunRequest {
        source: parse_source(&config.repo).unwrap(),
        output_location: project.path().to_path_buf(),
        style_example: None,
        step_ceiling: config.recursion_limit,
    };
    let err = Engine::from_context(&context)
        .run(request, &mut SilentProgress)
        .await
        .unwrap_err();

    match err {
        repo_scribe::WorkflowError::StepBudgetExceeded { ceiling, state } => {
            assert_eq!(ceiling, 4);
            assert_eq!(state.conversation.len(), 5);
            assert_eq!(tool_results(&state.conversation).len(), 2);
        }
        other => panic!("expected StepBudgetExceeded, got {other}"),
    }
    assert!(!project.path().join("README.md").exists());
}
