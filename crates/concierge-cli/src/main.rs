mod bootstrap_helpers;
mod cli_args;

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use concierge_discord_runtime::{run_discord_runtime, DiscordRuntimeConfig};
use tracing::info;

use crate::bootstrap_helpers::{init_tracing, load_concierge_config, load_content_templates};
use crate::cli_args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_filter.as_deref());

    let bot_token = cli.discord_bot_token.trim().to_string();
    if bot_token.is_empty() {
        bail!("--discord-bot-token must not be empty");
    }
    let concierge = load_concierge_config(&cli.config)?;
    let templates = load_content_templates(cli.templates.as_deref())?;
    info!(
        config = %cli.config.display(),
        guild_id = %concierge.guild_id,
        "starting concierge"
    );

    run_discord_runtime(DiscordRuntimeConfig {
        api_base: cli.discord_api_base,
        gateway_url: cli.discord_gateway_url,
        bot_token,
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
        reconnect_delay: Duration::from_millis(cli.reconnect_delay_ms),
        concierge,
        templates,
    })
    .await
}
