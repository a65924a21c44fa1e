use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "scribe.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "groq")]
    #[default]
    Groq,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Groq => write!(f, "groq"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "groq" => Ok(LLMProvider::Groq),
            "anthropic" | "claude" => Ok(LLMProvider::Anthropic),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl LLMProvider {
    /// 读取 API KEY 的环境变量，Ollama 不需要
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LLMProvider::OpenAI => Some("OPENAI_API_KEY"),
            LLMProvider::Groq => Some("GROQ_API_KEY"),
            LLMProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LLMProvider::DeepSeek => Some("DEEPSEEK_API_KEY"),
            LLMProvider::Mistral => Some("MISTRAL_API_KEY"),
            LLMProvider::OpenRouter => Some("OPENROUTER_API_KEY"),
            LLMProvider::Ollama => None,
        }
    }

    /// 未指定模型时使用的默认模型
    pub fn default_model(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "gpt-4o",
            LLMProvider::Groq => "moonshotai/kimi-k2-instruct-0905",
            LLMProvider::Anthropic => "claude-3-5-sonnet-latest",
            LLMProvider::DeepSeek => "deepseek-chat",
            LLMProvider::Mistral => "mistral-large-latest",
            LLMProvider::OpenRouter => "openai/gpt-4o",
            LLMProvider::Ollama => "llama3.1",
        }
    }

    /// 默认的 API 基地址
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::Groq => "https://api.groq.com/openai/v1",
            LLMProvider::Anthropic => "https://api.anthropic.com",
            LLMProvider::DeepSeek => "https://api.deepseek.com",
            LLMProvider::Mistral => "https://api.mistral.ai",
            LLMProvider::OpenRouter => "https://openrouter.ai/api/v1",
            LLMProvider::Ollama => "http://localhost:11434",
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// GitHub URL 或本地项目路径
    pub repo: String,

    /// README输出目录
    pub output_path: PathBuf,

    /// 风格参考README路径
    pub example_path: Option<PathBuf>,

    /// 单次运行允许的最大节点执行步数
    pub recursion_limit: usize,

    /// 提示词模板覆盖目录
    pub prompts_dir: Option<PathBuf>,

    /// GitHub访问令牌
    pub github_token: Option<String>,

    /// 是否启用详细日志
    pub verbose: bool,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 工具配置
    pub tools: ToolsConfig,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY，为空时从对应Provider的环境变量读取
    pub api_key: String,

    /// LLM API基地址，为空时使用Provider默认地址
    pub api_base_url: String,

    /// 模型名称，为空时使用Provider默认模型
    pub model: String,

    /// 最大tokens
    pub max_tokens: u64,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 工具配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    /// 远程文件最多返回的字符数
    pub max_remote_file_chars: usize,

    /// 本地文件最多返回的行数
    pub max_local_lines: usize,

    /// 本地文件大小上限（字节）
    pub max_local_file_bytes: u64,

    /// 目录探索的默认深度
    pub explore_max_depth: usize,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 用环境变量覆盖配置文件中的值
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github_token = Some(token);
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            match provider.parse::<LLMProvider>() {
                Ok(provider) => self.llm.provider = provider,
                Err(e) => eprintln!("⚠️ 警告: LLM_PROVIDER {}，保留 {}", e, self.llm.provider),
            }
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
    }
}

impl LLMConfig {
    /// 解析 API KEY：显式配置优先，其次读取Provider对应的环境变量
    pub fn resolve_api_key(&self) -> Result<String> {
        if !self.api_key.trim().is_empty() {
            return Ok(self.api_key.clone());
        }
        match self.provider.api_key_env() {
            None => Ok(String::new()),
            Some(var) => std::env::var(var)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| anyhow!("Missing API key for provider: {}", self.provider)),
        }
    }

    /// 实际使用的模型名称
    pub fn model_name(&self) -> String {
        if self.model.trim().is_empty() {
            self.provider.default_model().to_string()
        } else {
            self.model.clone()
        }
    }

    /// 实际使用的 API 基地址
    pub fn base_url(&self) -> String {
        if self.api_base_url.trim().is_empty() {
            self.provider.default_base_url().to_string()
        } else {
            self.api_base_url.clone()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo: String::from("."),
            output_path: PathBuf::from("."),
            example_path: None,
            recursion_limit: 30,
            prompts_dir: None,
            github_token: None,
            verbose: false,
            llm: LLMConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: String::new(),
            api_base_url: String::new(),
            model: String::new(),
            max_tokens: 8192,
            temperature: 0.5,
            retry_attempts: 3,
            retry_delay_ms: 5000,
            timeout_seconds: 300,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_remote_file_chars: 50_000,
            max_local_lines: 500,
            max_local_file_bytes: 1_000_000,
            explore_max_depth: 3,
        }
    }
}
