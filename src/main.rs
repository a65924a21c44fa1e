use crate::generator::workflow::launch;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod generator;
mod llm;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    // .env 中的变量不覆盖已存在的环境变量
    dotenvy::dotenv().ok();

    let args = cli::Args::parse();
    let config = args.into_config()?;

    let default_level = if config.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    launch(&config).await
}
