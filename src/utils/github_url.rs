use anyhow::{Result, anyhow};
use std::path::PathBuf;

use crate::generator::state::SourceDescriptor;

/// 从GitHub URL中解析 owner 与仓库名
pub fn parse_github_url(url: &str) -> Result<(String, String)> {
    let mut url = url.trim().trim_end_matches('/');

    if let Some(stripped) = url.strip_suffix(".git") {
        url = stripped;
    }

    let url = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let url = url.strip_prefix("github.com/").unwrap_or(url);

    let mut parts = url.split('/').filter(|part| !part.is_empty());
    match (parts.next(), parts.next()) {
        (Some(owner), Some(repo)) => Ok((owner.to_string(), repo.to_string())),
        _ => Err(anyhow!("Invalid GitHub URL: {}", url)),
    }
}

/// 根据输入判断数据源类型：包含 github.com 视为远程仓库，其余视为本地路径
pub fn parse_source(input: &str) -> Result<SourceDescriptor> {
    if input.contains("github.com") {
        let (owner, name) = parse_github_url(input)?;
        Ok(SourceDescriptor::RemoteRepository {
            owner,
            name,
            url: input.trim().to_string(),
        })
    } else {
        Ok(SourceDescriptor::LocalPath {
            path: PathBuf::from(input),
        })
    }
}
