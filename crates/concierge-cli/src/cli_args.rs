use std::path::PathBuf;

use clap::Parser;
use concierge_discord_runtime::{DEFAULT_DISCORD_API_BASE, DEFAULT_DISCORD_GATEWAY_URL};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "concierge",
    about = "Discord support-ticket bot with staff analytics and a live management dashboard",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "CONCIERGE_CONFIG",
        default_value = "concierge.json",
        help = "Guild configuration JSON file (channels, roles, limits, refresh tunables)"
    )]
    pub(crate) config: PathBuf,

    #[arg(
        long,
        env = "CONCIERGE_TEMPLATES",
        help = "Optional JSON file overriding the built-in message templates"
    )]
    pub(crate) templates: Option<PathBuf>,

    #[arg(
        long = "discord-bot-token",
        env = "CONCIERGE_DISCORD_BOT_TOKEN",
        hide_env_values = true,
        help = "Discord bot token used for REST calls and the gateway identify"
    )]
    pub(crate) discord_bot_token: String,

    #[arg(
        long = "discord-api-base",
        env = "CONCIERGE_DISCORD_API_BASE",
        default_value = DEFAULT_DISCORD_API_BASE,
        help = "Discord REST API base URL"
    )]
    pub(crate) discord_api_base: String,

    #[arg(
        long = "discord-gateway-url",
        env = "CONCIERGE_DISCORD_GATEWAY_URL",
        default_value = DEFAULT_DISCORD_GATEWAY_URL,
        help = "Discord gateway websocket URL"
    )]
    pub(crate) discord_gateway_url: String,

    #[arg(
        long = "request-timeout-ms",
        env = "CONCIERGE_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "HTTP timeout for Discord REST requests in milliseconds"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "CONCIERGE_RETRY_MAX_ATTEMPTS",
        default_value_t = 4,
        value_parser = parse_positive_usize,
        help = "Maximum attempts for retryable Discord API failures (429/5xx/transport)"
    )]
    pub(crate) retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "CONCIERGE_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base backoff delay in milliseconds for Discord API retries"
    )]
    pub(crate) retry_base_delay_ms: u64,

    #[arg(
        long = "reconnect-delay-ms",
        env = "CONCIERGE_RECONNECT_DELAY_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Delay before reconnecting after a gateway session ends"
    )]
    pub(crate) reconnect_delay_ms: u64,

    #[arg(
        long = "log-filter",
        env = "CONCIERGE_LOG_FILTER",
        help = "tracing filter directive (for example 'info' or 'concierge_tickets=debug'); RUST_LOG applies when unset"
    )]
    pub(crate) log_filter: Option<String>,
}
