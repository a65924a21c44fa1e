//! 本地目录探索工具

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Component, Path};
use walkdir::WalkDir;

use super::{AgentTool, parse_args, schema_of};

/// 探索时跳过的目录
const IGNORE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    "build",
    ".next",
    ".cache",
    "coverage",
    ".pytest_cache",
];

/// 目录探索工具
#[derive(Debug, Clone)]
pub struct ExploreDirectory {
    default_max_depth: usize,
}

/// 目录探索参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExploreDirectoryArgs {
    /// Directory to explore
    pub path: String,
    /// How many directory levels to descend (default 3)
    pub max_depth: Option<usize>,
}

/// 目录树节点
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Directory {
        children: BTreeMap<String, TreeNode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    File {
        size: u64,
    },
}

impl TreeNode {
    fn empty_directory() -> Self {
        TreeNode::Directory {
            children: BTreeMap::new(),
            error: None,
        }
    }
}

impl ExploreDirectory {
    pub fn new(default_max_depth: usize) -> Self {
        Self { default_max_depth }
    }

    /// 构建目录树；`max_depth` 层以内的目录会列出子项
    pub fn explore(&self, root: &Path, max_depth: usize) -> TreeNode {
        let mut tree = TreeNode::empty_directory();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth + 1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !is_ignored(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let node = if entry.file_type().is_dir() {
                        TreeNode::empty_directory()
                    } else {
                        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                        TreeNode::File { size }
                    };
                    insert(&mut tree, root, entry.path(), node);
                }
                Err(e) => {
                    // 无权限等错误记录到对应目录上
                    if let Some(path) = e.path() {
                        let node = TreeNode::Directory {
                            children: BTreeMap::new(),
                            error: Some("Permission denied".to_string()),
                        };
                        if path == root {
                            tree = node;
                        } else {
                            insert(&mut tree, root, path, node);
                        }
                    }
                }
            }
        }

        tree
    }
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || IGNORE_DIRS.contains(&name)
}

fn insert(tree: &mut TreeNode, root: &Path, path: &Path, node: TreeNode) {
    let Ok(relative) = path.strip_prefix(root) else {
        return;
    };
    let names: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    let Some((leaf, parents)) = names.split_last() else {
        return;
    };

    let mut current = tree;
    for name in parents {
        match current {
            TreeNode::Directory { children, .. } => match children.get_mut(name) {
                Some(child) => current = child,
                None => return,
            },
            TreeNode::File { .. } => return,
        }
    }

    if let TreeNode::Directory { children, .. } = current {
        children.insert(leaf.clone(), node);
    }
}

#[async_trait]
impl AgentTool for ExploreDirectory {
    fn name(&self) -> &'static str {
        "explore_directory"
    }

    fn description(&self) -> &'static str {
        "Explore a local directory and return its structure as JSON: nested directories and files with their size in bytes. Hidden entries and build/dependency folders are skipped."
    }

    fn parameters(&self) -> Value {
        schema_of::<ExploreDirectoryArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> Result<String> {
        let args: ExploreDirectoryArgs = parse_args(self.name(), args)?;
        tracing::info!(path = %args.path, "exploring local directory");

        let root = match std::fs::canonicalize(&args.path) {
            Ok(root) => root,
            Err(_) => {
                return Ok(serde_json::to_string(&serde_json::json!({
                    "error": format!("Path does not exist: {}", args.path)
                }))?);
            }
        };

        let max_depth = args.max_depth.unwrap_or(self.default_max_depth);
        let tree = self.explore(&root, max_depth);
        Ok(serde_json::to_string_pretty(&tree)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn sample_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/nested/deeper")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("src/nested/deeper/leaf.rs"), "").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        dir
    }

    #[test]
    fn test_explore_builds_sorted_tree_and_skips_ignored() {
        let dir = sample_project();
        let tree = ExploreDirectory::new(3).explore(dir.path(), 3);

        let TreeNode::Directory { children, error } = tree else {
            panic!("root must be a directory");
        };
        assert!(error.is_none());
        let names: Vec<_> = children.keys().cloned().collect();
        assert_eq!(names, vec!["Cargo.toml", "src"]);
        assert_eq!(
            children["Cargo.toml"],
            TreeNode::File {
                size: "[package]\nname = \"demo\"\n".len() as u64
            }
        );
    }

    #[test]
    fn test_explore_respects_max_depth() {
        let dir = sample_project();
        let tree = ExploreDirectory::new(3).explore(dir.path(), 1);

        let value = serde_json::to_value(&tree).unwrap();
        // src 在第 0 层之下可以列出，nested 位于截断层，不再展开
        assert_eq!(value["children"]["src"]["children"]["main.rs"]["type"], "file");
        assert_eq!(value["children"]["src"]["children"]["nested"]["type"], "directory");
        assert!(
            value["children"]["src"]["children"]["nested"]["children"]
                .as_object()
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_call_reports_missing_path() {
        let tool = ExploreDirectory::new(3);
        let output = tool
            .call(args(serde_json::json!({ "path": "/definitely/not/here" })))
            .await
            .unwrap();

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["error"], "Path does not exist: /definitely/not/here");
    }

    #[tokio::test]
    async fn test_call_returns_json_tree() {
        let dir = sample_project();
        let tool = ExploreDirectory::new(3);
        let output = tool
            .call(args(serde_json::json!({
                "path": dir.path().to_string_lossy()
            })))
            .await
            .unwrap();

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["type"], "directory");
        assert_eq!(
            value["children"]["src"]["children"]["nested"]["children"]["deeper"]["children"]["leaf.rs"]["size"],
            0
        );
    }
}
