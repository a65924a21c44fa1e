use crate::config::{Config, DEFAULT_CONFIG_FILE, LLMProvider};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// repo-scribe - 由多个AI Agent协作为项目生成README
#[derive(Parser, Debug)]
#[command(name = "repo-scribe")]
#[command(
    about = "Generate a README for a GitHub repository or a local project with a pipeline of explorer, analyzer and writer agents."
)]
#[command(version)]
pub struct Args {
    /// GitHub仓库URL或本地项目路径
    #[arg(short, long)]
    pub repo: String,

    /// LLM Provider (openai, groq, anthropic, deepseek, mistral, openrouter, ollama)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// 模型名称
    #[arg(short, long)]
    pub model: Option<String>,

    /// 风格参考README文件
    #[arg(short, long)]
    pub example: Option<PathBuf>,

    /// README输出目录
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 最大节点执行步数
    #[arg(long)]
    pub recursion_limit: Option<usize>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 提示词模板覆盖目录
    #[arg(long)]
    pub prompts_dir: Option<PathBuf>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须可读
            Config::from_file(config_path)
                .with_context(|| format!("无法读取配置文件 {:?}", config_path))?
        } else {
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEFAULT_CONFIG_FILE);

            if default_config_path.exists() {
                Config::from_file(&default_config_path).with_context(|| {
                    format!("无法读取默认配置文件 {:?}", default_config_path)
                })?
            } else {
                Config::default()
            }
        };

        config.apply_env_overrides();
        config.repo = self.repo;

        if let Some(provider_str) = self.provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider {}",
                    provider_str, config.llm.provider
                );
            }
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }

        if let Some(example) = self.example {
            config.example_path = Some(example);
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(recursion_limit) = self.recursion_limit {
            config.recursion_limit = recursion_limit;
        }
        if let Some(prompts_dir) = self.prompts_dir {
            config.prompts_dir = Some(prompts_dir);
        }
        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}
