//! 提示词模板加载 - 优先读取覆盖目录，其次使用内置模板

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// 内置模板：(phase, variant, 内容)
const EMBEDDED_TEMPLATES: &[(&str, &str, &str)] = &[
    ("explorer", "base", include_str!("../../prompts/explorer/base.md")),
    (
        "explorer",
        "github_instructions",
        include_str!("../../prompts/explorer/github_instructions.md"),
    ),
    (
        "explorer",
        "local_instructions",
        include_str!("../../prompts/explorer/local_instructions.md"),
    ),
    ("analyzer", "base", include_str!("../../prompts/analyzer/base.md")),
    (
        "analyzer",
        "read_github",
        include_str!("../../prompts/analyzer/read_github.md"),
    ),
    (
        "analyzer",
        "read_local",
        include_str!("../../prompts/analyzer/read_local.md"),
    ),
    ("writer", "base", include_str!("../../prompts/writer/base.md")),
    (
        "writer",
        "github_context",
        include_str!("../../prompts/writer/github_context.md"),
    ),
    (
        "writer",
        "example_readme",
        include_str!("../../prompts/writer/example_readme.md"),
    ),
];

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template not found: {phase}/{variant}")]
    TemplateNotFound { phase: String, variant: String },

    #[error("failed to read prompt template {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 提示词模板解析器
#[derive(Debug, Clone, Default)]
pub struct PromptLoader {
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    /// 解析模板并替换 `{NAME}` 形式的占位符
    pub fn resolve(
        &self,
        phase: &str,
        variant: &str,
        parameters: &HashMap<&str, String>,
    ) -> Result<String, PromptError> {
        let template = self.load(phase, variant)?;
        Ok(fill(&template, parameters))
    }

    fn load(&self, phase: &str, variant: &str) -> Result<String, PromptError> {
        if let Some(dir) = &self.override_dir {
            let path = template_path(dir, phase, variant);
            if path.is_file() {
                return std::fs::read_to_string(&path)
                    .map_err(|source| PromptError::Io { path, source });
            }
        }

        EMBEDDED_TEMPLATES
            .iter()
            .find(|(p, v, _)| *p == phase && *v == variant)
            .map(|(_, _, content)| content.to_string())
            .ok_or_else(|| PromptError::TemplateNotFound {
                phase: phase.to_string(),
                variant: variant.to_string(),
            })
    }
}

fn template_path(dir: &Path, phase: &str, variant: &str) -> PathBuf {
    dir.join(phase).join(format!("{}.md", variant))
}

/// 单次从左到右替换占位符，替换进来的值不会再被扫描
fn fill(template: &str, parameters: &HashMap<&str, String>) -> String {
    let mut content = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        content.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let value = tail
            .find('}')
            .and_then(|close| parameters.get(&tail[..close]).map(|value| (close, value)));
        match value {
            Some((close, value)) => {
                content.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                content.push('{');
                rest = tail;
            }
        }
    }
    content.push_str(rest);
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_embedded_template_fills_parameters() {
        let loader = PromptLoader::default();
        let params = HashMap::from([
            ("OWNER", "acme".to_string()),
            ("REPO", "widget".to_string()),
            ("GITHUB_URL", "https://github.com/acme/widget".to_string()),
        ]);

        let content = loader
            .resolve("explorer", "github_instructions", &params)
            .unwrap();

        assert!(content.contains("acme"));
        assert!(content.contains("widget"));
        assert!(!content.contains("{OWNER}"));
    }

    #[test]
    fn test_missing_template_is_reported() {
        let loader = PromptLoader::default();
        let err = loader
            .resolve("explorer", "nonexistent", &HashMap::new())
            .unwrap_err();

        assert!(matches!(err, PromptError::TemplateNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "prompt template not found: explorer/nonexistent"
        );
    }

    #[test]
    fn test_override_dir_takes_precedence() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("writer")).unwrap();
        std::fs::write(
            dir.path().join("writer/base.md"),
            "custom writer for {OUTPUT_PATH}",
        )
        .unwrap();

        let loader = PromptLoader::new(Some(dir.path().to_path_buf()));
        let params = HashMap::from([("OUTPUT_PATH", "/out".to_string())]);

        assert_eq!(
            loader.resolve("writer", "base", &params).unwrap(),
            "custom writer for /out"
        );
        // 覆盖目录缺失的模板回退到内置模板
        assert!(loader.resolve("analyzer", "read_local", &params).is_ok());
    }

    #[test]
    fn test_fill_leaves_unknown_placeholders() {
        let params = HashMap::from([("A", "1".to_string())]);
        assert_eq!(fill("{A} {B}", &params), "1 {B}");
        assert_eq!(fill("{{A}} {", &params), "{1} {");
        assert_eq!(fill("fn main() {}", &params), "fn main() {}");
    }

    #[test]
    fn test_fill_does_not_rescan_inserted_values() {
        let params = HashMap::from([
            ("EXAMPLE", "Run with `--out {OUTPUT_PATH}`".to_string()),
            ("OUTPUT_PATH", "/out".to_string()),
            ("CONTEXT", "{EXAMPLE}".to_string()),
        ]);

        // HashMap 的迭代顺序每次不同，多次构建以覆盖不同顺序
        for _ in 0..32 {
            let params = params.clone().into_iter().collect::<HashMap<_, _>>();
            assert_eq!(
                fill("{OUTPUT_PATH}: {EXAMPLE} / {CONTEXT}", &params),
                "/out: Run with `--out {OUTPUT_PATH}` / {EXAMPLE}"
            );
        }
    }
}
