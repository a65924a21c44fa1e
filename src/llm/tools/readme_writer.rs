//! README写入工具

use anyhow::{Context, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::{AgentTool, parse_args, schema_of};

pub const README_FILE_NAME: &str = "README.md";

#[derive(Debug, Clone, Default)]
pub struct WriteReadme;

/// README写入参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteReadmeArgs {
    /// Full Markdown content of the README
    pub content: String,
    /// Output directory (a file path writes next to that file)
    pub output_path: String,
}

/// README最终落盘位置
pub fn readme_destination(output_path: &Path) -> PathBuf {
    let dir = if output_path.is_file() {
        output_path.parent().unwrap_or(output_path)
    } else {
        output_path
    };
    dir.join(README_FILE_NAME)
}

#[async_trait]
impl AgentTool for WriteReadme {
    fn name(&self) -> &'static str {
        "write_readme"
    }

    fn description(&self) -> &'static str {
        "Write the final README.md into the output directory."
    }

    fn parameters(&self) -> Value {
        schema_of::<WriteReadmeArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> Result<String> {
        let args: WriteReadmeArgs = parse_args(self.name(), args)?;
        let readme_path = readme_destination(Path::new(&args.output_path));

        if let Some(parent) = readme_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&readme_path, &args.content)
            .with_context(|| format!("failed to write README to {}", readme_path.display()))?;

        tracing::info!(path = %readme_path.display(), bytes = args.content.len(), "README written");
        Ok(format!("Successfully wrote README to {}", readme_path.display()))
    }
}
