pub mod github_url;
pub mod prompt_loader;
