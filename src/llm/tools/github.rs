//! GitHub仓库探查工具 - 基于GitHub REST API

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::Engine as _;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{AgentTool, parse_args, schema_of};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// 统计时跳过的路径片段
const IGNORE_PATTERNS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    "dist",
    "build",
    ".next",
    ".cache",
    "coverage",
    "vendor",
    "target",
    "test",
    "tests",
    "__tests__",
    ".github",
    "docs",
    "examples",
];

const CONFIG_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "setup.py",
    "Cargo.toml",
    "go.mod",
    "composer.json",
    "build.gradle",
    "pom.xml",
    "Makefile",
    "Dockerfile",
    "docker-compose.yml",
    "README.md",
    "LICENSE",
    ".env.example",
    "tsconfig.json",
    "setup.cfg",
    "poetry.lock",
    "yarn.lock",
    "package-lock.json",
];

const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "go", "rs", "java", "cpp", "c", "h", "rb", "php", "swift",
    "kt",
];

const MAX_SOURCE_FILES: usize = 20;
const MAX_SOURCE_DEPTH: usize = 4;
const MAX_EXTENSIONS: usize = 15;
const MAX_DIRECTORIES: usize = 10;

/// GitHub API 客户端
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

/// git tree 条目
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitTree {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
}

/// contents 接口返回：文件内容或目录条目
#[derive(Debug, Clone, PartialEq)]
pub enum RepoContent {
    File(String),
    Directory(Vec<String>),
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("repo-scribe/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build GitHub HTTP client")?;
        Ok(Self {
            http,
            api_base: GITHUB_API_BASE.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn repo_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}", self.api_base, owner, repo)
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {}", token));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).context("GitHub returned malformed JSON")
    }

    /// 仓库元信息
    pub async fn repo_info(&self, owner: &str, repo: &str) -> Result<Value> {
        self.get_json(&self.repo_url(owner, repo)).await
    }

    /// 默认分支上的完整 git tree
    pub async fn tree(&self, owner: &str, repo: &str) -> Result<GitTree> {
        let info = self.repo_info(owner, repo).await?;
        let branch = info
            .get("default_branch")
            .and_then(Value::as_str)
            .unwrap_or("main");

        let url = format!(
            "{}/git/trees/{}?recursive=1",
            self.repo_url(owner, repo),
            branch
        );
        let value = self.get_json(&url).await?;
        serde_json::from_value(value).context("unexpected git tree payload")
    }

    /// 获取单个路径的内容
    pub async fn content(&self, owner: &str, repo: &str, path: &str) -> Result<RepoContent> {
        let url = format!(
            "{}/contents/{}",
            self.repo_url(owner, repo),
            path.trim_start_matches('/')
        );
        decode_content(self.get_json(&url).await?)
    }
}

fn decode_content(value: Value) -> Result<RepoContent> {
    match value {
        Value::Array(items) => Ok(RepoContent::Directory(
            items
                .iter()
                .map(|item| {
                    item.get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string()
                })
                .collect(),
        )),
        Value::Object(object) => {
            let content = object.get("content").and_then(Value::as_str).unwrap_or("");
            if object.get("encoding").and_then(Value::as_str) == Some("base64") {
                let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .context("failed to decode base64 content")?;
                let text = String::from_utf8(bytes).context("file is not valid UTF-8")?;
                Ok(RepoContent::File(text))
            } else {
                Ok(RepoContent::File(content.to_string()))
            }
        }
        other => Err(anyhow!("Unexpected data type received: {}", json_type(&other))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 带计数的名称，按计数降序排列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

/// 仓库结构摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TreeSummary {
    pub total_files: usize,
    pub total_dirs: usize,
    pub config_files: Vec<String>,
    pub source_files: Vec<String>,
    pub main_directories: Vec<NamedCount>,
    pub file_extensions: Vec<NamedCount>,
    pub readme_path: Option<String>,
    pub license_path: Option<String>,
}

/// 从 git tree 中提炼结构摘要，而不是返回完整的目录树
pub fn summarize_tree(tree: &GitTree) -> TreeSummary {
    let mut summary = TreeSummary::default();
    let mut sources: Vec<(&str, usize, u64)> = Vec::new();
    let mut extensions: HashMap<String, usize> = HashMap::new();
    let mut directories: HashMap<String, usize> = HashMap::new();

    for entry in &tree.tree {
        let parts: Vec<&str> = entry.path.split('/').collect();
        if parts.iter().any(|part| IGNORE_PATTERNS.contains(part)) {
            continue;
        }

        match entry.kind.as_str() {
            "blob" => {
                summary.total_files += 1;
                let filename = parts.last().copied().unwrap_or_default();
                let lowered = filename.to_lowercase();

                if matches!(
                    lowered.as_str(),
                    "readme.md" | "readme.rst" | "readme.txt" | "readme"
                ) {
                    summary.readme_path = Some(entry.path.clone());
                }
                if matches!(lowered.as_str(), "license" | "license.md" | "license.txt") {
                    summary.license_path = Some(entry.path.clone());
                }
                if CONFIG_FILES.contains(&filename) {
                    summary.config_files.push(entry.path.clone());
                }

                if let Some((_, ext)) = filename.rsplit_once('.') {
                    if SOURCE_EXTENSIONS.contains(&ext) && parts.len() <= MAX_SOURCE_DEPTH {
                        sources.push((entry.path.as_str(), parts.len(), entry.size.unwrap_or(0)));
                    }
                    *extensions.entry(ext.to_string()).or_insert(0) += 1;
                }

                if parts.len() > 1 {
                    *directories.entry(parts[0].to_string()).or_insert(0) += 1;
                }
            }
            "tree" => summary.total_dirs += 1,
            _ => {}
        }
    }

    // 浅层优先，同层按体积降序
    sources.sort_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)));
    summary.source_files = sources
        .into_iter()
        .take(MAX_SOURCE_FILES)
        .map(|(path, _, _)| path.to_string())
        .collect();
    summary.file_extensions = top_counts(extensions, MAX_EXTENSIONS);
    summary.main_directories = top_counts(directories, MAX_DIRECTORIES);

    summary
}

fn top_counts(counts: HashMap<String, usize>, limit: usize) -> Vec<NamedCount> {
    let mut entries: Vec<NamedCount> = counts
        .into_iter()
        .map(|(name, count)| NamedCount { name, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(limit);
    entries
}

/// 仓库元信息摘要
pub fn summarize_metadata(info: &Value) -> Value {
    let license = info
        .get("license")
        .and_then(|license| license.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("No License");

    serde_json::json!({
        "name": info.get("name"),
        "description": info.get("description"),
        "stars": info.get("stargazers_count"),
        "forks": info.get("forks_count"),
        "language": info.get("language"),
        "topics": info.get("topics").cloned().unwrap_or_else(|| Value::Array(Vec::new())),
        "license": license,
        "homepage": info.get("homepage"),
        "created_at": info.get("created_at"),
        "updated_at": info.get("updated_at"),
    })
}

fn truncate_chars(content: String, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n\n... (truncated)", &content[..cut]),
        None => content,
    }
}

fn error_json(e: &anyhow::Error) -> Result<String> {
    Ok(serde_json::to_string(
        &serde_json::json!({ "error": format!("{:#}", e) }),
    )?)
}

/// 仓库定位参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RepoArgs {
    /// GitHub username or organization
    pub owner: String,
    /// Repository name
    pub repo: String,
}

/// 仓库文件读取参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadGitHubFileArgs {
    /// GitHub username or organization
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Path of the file inside the repository
    pub filepath: String,
}

#[derive(Debug, Clone)]
pub struct ExploreGitHubRepo {
    client: GitHubClient,
}

impl ExploreGitHubRepo {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AgentTool for ExploreGitHubRepo {
    fn name(&self) -> &'static str {
        "explore_github_repo"
    }

    fn description(&self) -> &'static str {
        "Explore a GitHub repository structure. Returns a JSON summary of the tree with key config files, top source files, extension and directory counts (not the full tree)."
    }

    fn parameters(&self) -> Value {
        schema_of::<RepoArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> Result<String> {
        let args: RepoArgs = parse_args(self.name(), args)?;
        tracing::info!(owner = %args.owner, repo = %args.repo, "exploring GitHub repository");

        match self.client.tree(&args.owner, &args.repo).await {
            Ok(tree) => Ok(serde_json::to_string_pretty(&summarize_tree(&tree))?),
            Err(e) => error_json(&e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GetGitHubRepoMetadata {
    client: GitHubClient,
}

impl GetGitHubRepoMetadata {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AgentTool for GetGitHubRepoMetadata {
    fn name(&self) -> &'static str {
        "get_github_repo_metadata"
    }

    fn description(&self) -> &'static str {
        "Get GitHub repository metadata (description, stars, forks, language, topics, license, homepage) as JSON."
    }

    fn parameters(&self) -> Value {
        schema_of::<RepoArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> Result<String> {
        let args: RepoArgs = parse_args(self.name(), args)?;

        match self.client.repo_info(&args.owner, &args.repo).await {
            Ok(info) => Ok(serde_json::to_string_pretty(&summarize_metadata(&info))?),
            Err(e) => error_json(&e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadGitHubFile {
    client: GitHubClient,
    max_chars: usize,
}

impl ReadGitHubFile {
    pub fn new(client: GitHubClient, max_chars: usize) -> Self {
        Self { client, max_chars }
    }
}

#[async_trait]
impl AgentTool for ReadGitHubFile {
    fn name(&self) -> &'static str {
        "read_github_file"
    }

    fn description(&self) -> &'static str {
        "Read a file from a GitHub repository and return its contents."
    }

    fn parameters(&self) -> Value {
        schema_of::<ReadGitHubFileArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> Result<String> {
        let args: ReadGitHubFileArgs = parse_args(self.name(), args)?;
        tracing::info!(owner = %args.owner, repo = %args.repo, filepath = %args.filepath, "reading GitHub file");

        let content = self
            .client
            .content(&args.owner, &args.repo, &args.filepath)
            .await
            .context("Error reading file")?;

        Ok(match content {
            RepoContent::File(text) => truncate_chars(text, self.max_chars),
            RepoContent::Directory(names) => format!(
                "Error: '{}' is a directory. Contents: {}. Please call read_github_file again with a specific file path.",
                args.filepath,
                names.join(", ")
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, kind: &str, size: u64) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: kind.to_string(),
            size: Some(size),
        }
    }

    #[test]
    fn test_summarize_tree() {
        let tree = GitTree {
            tree: vec![
                entry("README.md", "blob", 100),
                entry("LICENSE", "blob", 50),
                entry("Cargo.toml", "blob", 10),
                entry("src", "tree", 0),
                entry("src/main.rs", "blob", 300),
                entry("src/lib.rs", "blob", 900),
                entry("src/a/b/c/deep.rs", "blob", 5),
                entry("tests/it.rs", "blob", 1000),
                entry("node_modules/x/index.js", "blob", 1),
            ],
        };

        let summary = summarize_tree(&tree);

        assert_eq!(summary.total_files, 6);
        assert_eq!(summary.total_dirs, 1);
        assert_eq!(summary.readme_path.as_deref(), Some("README.md"));
        assert_eq!(summary.license_path.as_deref(), Some("LICENSE"));
        assert_eq!(summary.config_files, vec!["README.md", "LICENSE", "Cargo.toml"]);
        // 深度超过 4 的源码文件不计入，同层按体积降序
        assert_eq!(summary.source_files, vec!["src/lib.rs", "src/main.rs"]);
        assert_eq!(
            summary.file_extensions[0],
            NamedCount {
                name: "rs".to_string(),
                count: 3
            }
        );
        assert_eq!(
            summary.main_directories,
            vec![NamedCount {
                name: "src".to_string(),
                count: 3
            }]
        );
    }

    #[test]
    fn test_top_counts_orders_and_truncates() {
        let counts = HashMap::from([
            ("b".to_string(), 2),
            ("a".to_string(), 2),
            ("c".to_string(), 5),
        ]);
        let top = top_counts(counts, 2);
        assert_eq!(
            top.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["c", "a"]
        );
    }

    #[test]
    fn test_decode_base64_file_content() {
        let value = serde_json::json!({
            "encoding": "base64",
            "content": "IyBEZW1v\nCg==\n"
        });
        assert_eq!(
            decode_content(value).unwrap(),
            RepoContent::File("# Demo\n".to_string())
        );
    }

    #[test]
    fn test_decode_directory_listing() {
        let value = serde_json::json!([{ "name": "main.rs" }, { "name": "lib.rs" }]);
        assert_eq!(
            decode_content(value).unwrap(),
            RepoContent::Directory(vec!["main.rs".to_string(), "lib.rs".to_string()])
        );
        assert!(decode_content(Value::Bool(true)).is_err());
    }

    #[test]
    fn test_summarize_metadata_defaults_license() {
        let info = serde_json::json!({
            "name": "widget",
            "stargazers_count": 42,
            "license": null
        });
        let metadata = summarize_metadata(&info);

        assert_eq!(metadata["name"], "widget");
        assert_eq!(metadata["stars"], 42);
        assert_eq!(metadata["license"], "No License");
        assert_eq!(metadata["topics"], serde_json::json!([]));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc".to_string(), 5), "abc");
        assert_eq!(truncate_chars("abcdef".to_string(), 3), "abc\n\n... (truncated)");
    }
}
