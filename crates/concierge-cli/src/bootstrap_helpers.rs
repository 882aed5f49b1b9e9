use std::path::Path;

use anyhow::{Context, Result};
use concierge_core::ContentTemplates;
use concierge_discord_runtime::ConciergeConfig;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

pub(crate) fn init_tracing(log_filter: Option<&str>) {
    let env_filter = match log_filter.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directives) => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse_lossy(directives),
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

pub(crate) fn load_concierge_config(path: &Path) -> Result<ConciergeConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ConciergeConfig::from_json_str(&raw)
        .with_context(|| format!("invalid config {}", path.display()))
}

pub(crate) fn load_content_templates(path: Option<&Path>) -> Result<ContentTemplates> {
    let Some(path) = path else {
        return Ok(ContentTemplates::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read templates {}", path.display()))?;
    ContentTemplates::from_json_str(&raw)
        .with_context(|| format!("failed to parse templates {}", path.display()))
}
