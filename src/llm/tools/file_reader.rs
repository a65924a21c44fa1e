//! 本地文件读取工具

use anyhow::{Context, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use super::{AgentTool, parse_args, schema_of};

#[derive(Debug, Clone)]
pub struct ReadFile {
    default_max_lines: usize,
    max_file_bytes: u64,
}

/// 文件读取参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Path of the file to read
    pub filepath: String,
    /// Maximum number of lines to return (default 500)
    pub max_lines: Option<usize>,
}

impl ReadFile {
    pub fn new(default_max_lines: usize, max_file_bytes: u64) -> Self {
        Self {
            default_max_lines,
            max_file_bytes,
        }
    }

    fn read(&self, filepath: &str, max_lines: usize) -> Result<String> {
        let path = Path::new(filepath);
        if !path.exists() {
            return Ok(format!("Error: File not found: {}", filepath));
        }

        let metadata = std::fs::metadata(path)
            .with_context(|| format!("failed to stat {}", filepath))?;
        if metadata.len() > self.max_file_bytes {
            return Ok(format!(
                "Error: File too large (>{} bytes): {}",
                self.max_file_bytes, filepath
            ));
        }

        let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", filepath))?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(truncate_lines(&text, max_lines))
    }
}

fn truncate_lines(text: &str, max_lines: usize) -> String {
    let mut lines = text.split_inclusive('\n');
    let mut content: String = lines.by_ref().take(max_lines).collect();
    if lines.next().is_some() {
        content.push_str(&format!("\n... (truncated after {} lines)", max_lines));
    }
    content
}

#[async_trait]
impl AgentTool for ReadFile {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read a local text file. Long files are truncated after max_lines lines."
    }

    fn parameters(&self) -> Value {
        schema_of::<ReadFileArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> Result<String> {
        let args: ReadFileArgs = parse_args(self.name(), args)?;
        tracing::info!(filepath = %args.filepath, "reading local file");

        let max_lines = args.max_lines.unwrap_or(self.default_max_lines);
        self.read(&args.filepath, max_lines)
    }
}
