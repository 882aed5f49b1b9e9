//! Discord runtime: service wiring, gateway session and reconnect loop.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use concierge_analytics::StaffAnalyticsAggregator;
use concierge_core::{ContentTemplates, PlatformApi, PlatformGuild, PlatformUser};
use concierge_dashboard::{
    start_dashboard_refresher, DashboardConfig, DashboardEventSink, DashboardPublisher,
    DashboardRefresherHandle,
};
use concierge_tickets::{
    spawn_event_subscriber, TicketLifecycleConfig, TicketLifecycleManager, TicketLogNotifier,
};
use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::{
    concierge_config::ConciergeConfig, event_router::EventRouter,
    panel_publisher::PanelPublisher, staff_query::StaffQueryFlow,
};

mod discord_api_client;
mod discord_gateway;
mod discord_payloads;

pub use discord_api_client::DiscordApiClient;
use discord_gateway::{
    heartbeat_payload, identify_payload, normalize_dispatch, parse_gateway_frame, GatewayFrame,
    OP_DISPATCH, OP_HEARTBEAT, OP_HEARTBEAT_ACK, OP_HELLO, OP_INVALID_SESSION, OP_RECONNECT,
};


pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Runtime configuration for the Discord transport loop.
#[derive(Clone)]
pub struct DiscordRuntimeConfig {
    pub api_base: String,
    pub gateway_url: String,
    pub bot_token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub reconnect_delay: Duration,
    pub concierge: ConciergeConfig,
    pub templates: ContentTemplates,
}

/// Every long-lived service of one bot process, wired against a platform implementation.
pub struct ConciergeServices {
    pub bot_user: PlatformUser,
    pub guild: PlatformGuild,
    pub tickets: Arc<TicketLifecycleManager>,
    pub dashboard: Arc<DashboardPublisher>,
    pub panel: Arc<PanelPublisher>,
    pub router: Arc<EventRouter>,
    refresher: DashboardRefresherHandle,
    subscribers: Vec<JoinHandle<()>>,
}

impl ConciergeServices {
    /// Resolves the bot and guild, builds the services, publishes the entry panel, renders the
    /// dashboard once and starts the recurring refresher and the lifecycle subscribers.
    pub async fn bootstrap(
        platform: Arc<dyn PlatformApi>,
        templates: Arc<ContentTemplates>,
        config: &ConciergeConfig,
        started_at: Instant,
    ) -> Result<Self> {
        config.validate()?;
        let bot_user = platform
            .current_user()
            .await
            .context("failed to resolve bot user")?;
        let guild = platform
            .guild(&config.guild_id)
            .await
            .with_context(|| format!("failed to fetch guild {}", config.guild_id))?;
        info!(
            bot_user_id = %bot_user.id,
            guild_id = %guild.id,
            guild_name = %guild.name,
            "concierge bootstrapping"
        );

        let tickets = Arc::new(TicketLifecycleManager::new(
            Arc::clone(&platform),
            Arc::clone(&templates),
            TicketLifecycleConfig {
                guild: guild.clone(),
                ticket_category_id: config.ticket_category_id.clone(),
                support_role_id: config.support_role_id.clone(),
                staff_role_id: config.staff_role_id.clone(),
                max_tickets_per_user: config.max_tickets_per_user,
                close_grace: config.close_grace(),
            },
        ));
        let analytics = Arc::new(StaffAnalyticsAggregator::new(
            Arc::clone(&platform),
            config.scan_window(),
        ));
        let dashboard = Arc::new(DashboardPublisher::new(
            Arc::clone(&platform),
            Arc::clone(&templates),
            Arc::clone(&tickets),
            Arc::clone(&analytics),
            DashboardConfig {
                guild: guild.clone(),
                bot_user_id: bot_user.id.clone(),
                management_channel_id: config.management_channel_id.clone(),
                staff_log_channel_id: config.staff_log_channel_id.clone(),
                search_window: config.dashboard_search_window,
                top_n: config.leaderboard_top_n,
            },
            started_at,
        ));
        let panel = Arc::new(PanelPublisher::new(
            Arc::clone(&platform),
            Arc::clone(&templates),
            guild.clone(),
            bot_user.id.clone(),
            config.panel_channel_id.clone(),
        ));
        let staff_query = Arc::new(StaffQueryFlow::new(
            Arc::clone(&platform),
            Arc::clone(&templates),
            analytics,
            guild.clone(),
            config.staff_log_channel_id.clone(),
        ));
        let router = Arc::new(EventRouter::new(
            Arc::clone(&platform),
            Arc::clone(&templates),
            Arc::clone(&tickets),
            Arc::clone(&panel),
            staff_query,
            config.guild_id.clone(),
            config.command_prefix.clone(),
        ));

        let subscribers = vec![
            spawn_event_subscriber(
                tickets.events(),
                Arc::new(TicketLogNotifier::new(
                    Arc::clone(&platform),
                    Arc::clone(&templates),
                    guild.clone(),
                    config.ticket_log_channel_id.clone(),
                    config.staff_log_channel_id.clone(),
                )),
            ),
            spawn_event_subscriber(
                tickets.events(),
                Arc::new(DashboardEventSink::new(Arc::clone(&dashboard))),
            ),
        ];

        if let Err(error) = panel.publish().await {
            warn!(error = %error, "initial ticket panel publish failed");
        }
        match dashboard.refresh().await {
            Ok(outcome) => debug!(message_id = outcome.message_id(), "initial dashboard rendered"),
            Err(error) => warn!(error = %error, "initial dashboard refresh failed"),
        }
        let refresher =
            start_dashboard_refresher(Arc::clone(&dashboard), config.dashboard_refresh_interval())?;

        Ok(Self {
            bot_user,
            guild,
            tickets,
            dashboard,
            panel,
            router,
            refresher,
            subscribers,
        })
    }

    pub fn refresher(&self) -> &DashboardRefresherHandle {
        &self.refresher
    }

    pub async fn shutdown(mut self) {
        self.refresher.shutdown().await;
        for subscriber in self.subscribers.drain(..) {
            subscriber.abort();
        }
        info!("concierge services stopped");
    }
}

pub async fn run_discord_runtime(config: DiscordRuntimeConfig) -> Result<()> {
    let started_at = Instant::now();
    let client = DiscordApiClient::new(
        config.api_base.clone(),
        config.bot_token.clone(),
        config.request_timeout_ms,
        config.retry_max_attempts,
        config.retry_base_delay_ms,
    )?;
    let platform: Arc<dyn PlatformApi> = Arc::new(client);
    let services = ConciergeServices::bootstrap(
        platform,
        Arc::new(config.templates.clone()),
        &config.concierge,
        started_at,
    )
    .await?;

    let mut runtime = DiscordGatewayRuntime {
        gateway_url: config.gateway_url.clone(),
        bot_token: config.bot_token.trim().to_string(),
        reconnect_delay: config.reconnect_delay,
        router: Arc::clone(&services.router),
    };
    let result = runtime.run().await;
    services.shutdown().await;
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Reconnect,
}

struct DiscordGatewayRuntime {
    gateway_url: String,
    bot_token: String,
    reconnect_delay: Duration,
    router: Arc<EventRouter>,
}

impl DiscordGatewayRuntime {
    async fn run(&mut self) -> Result<()> {
        loop {
            match self.run_gateway_session().await {
                Ok(SessionEnd::Shutdown) => {
                    info!("discord runtime shutdown requested");
                    return Ok(());
                }
                Ok(SessionEnd::Reconnect) => info!("discord gateway requested reconnect"),
                Err(error) => {
                    let detail = format!("{error:#}");
                    error!(error = %detail, "discord gateway session error");
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("discord runtime shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn run_gateway_session(&mut self) -> Result<SessionEnd> {
        let (stream, _response) = connect_async(self.gateway_url.as_str())
            .await
            .context("failed to connect discord gateway websocket")?;
        let (mut sink, mut source) = stream.split();

        let hello = loop {
            let Some(message) = source.next().await else {
                bail!("discord gateway closed before hello");
            };
            let message = message.context("failed reading discord gateway message")?;
            if let Some(frame) = parse_gateway_frame(message)? {
                if frame.op == OP_HELLO {
                    break frame;
                }
            }
        };
        let heartbeat_ms = hello
            .heartbeat_interval_ms()
            .filter(|interval| *interval > 0)
            .context("discord hello carried no heartbeat interval")?;
        sink.send(WsMessage::Text(identify_payload(&self.bot_token).to_string().into()))
            .await
            .context("failed to send discord identify")?;
        info!(heartbeat_ms, "discord gateway connected");

        let period = Duration::from_millis(heartbeat_ms);
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut sequence: Option<u64> = None;
        let mut awaiting_ack = false;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        warn!("discord heartbeat not acknowledged, reconnecting");
                        return Ok(SessionEnd::Reconnect);
                    }
                    sink.send(WsMessage::Text(heartbeat_payload(sequence).to_string().into()))
                        .await
                        .context("failed to send discord heartbeat")?;
                    awaiting_ack = true;
                }
                maybe_message = source.next() => {
                    let Some(message_result) = maybe_message else {
                        return Ok(SessionEnd::Reconnect);
                    };
                    let message = message_result.context("failed reading discord gateway message")?;
                    if let WsMessage::Close(close) = &message {
                        info!(close = ?close, "discord gateway closed the session");
                        return Ok(SessionEnd::Reconnect);
                    }
                    let Some(frame) = parse_gateway_frame(message)? else {
                        continue;
                    };
                    if let Some(value) = frame.s {
                        sequence = Some(value);
                    }
                    match frame.op {
                        OP_DISPATCH => self.handle_dispatch(&frame),
                        OP_HEARTBEAT => {
                            sink.send(WsMessage::Text(heartbeat_payload(sequence).to_string().into()))
                                .await
                                .context("failed to send discord heartbeat")?;
                        }
                        OP_HEARTBEAT_ACK => awaiting_ack = false,
                        OP_RECONNECT | OP_INVALID_SESSION => return Ok(SessionEnd::Reconnect),
                        other => debug!(op = other, "ignoring discord gateway opcode"),
                    }
                }
            }
        }
    }

    fn handle_dispatch(&self, frame: &GatewayFrame) {
        if frame.t.as_deref() == Some("READY") {
            info!("discord gateway session ready");
            return;
        }
        match normalize_dispatch(frame) {
            Ok(Some(event)) => {
                debug!(kind = event.kind(), "discord event received");
                let router = Arc::clone(&self.router);
                tokio::spawn(async move {
                    router.dispatch(event).await;
                });
            }
            Ok(None) => {}
            Err(error) => {
                let detail = format!("{error:#}");
                warn!(
                    event_type = frame.t.as_deref().unwrap_or_default(),
                    error = %detail,
                    "failed to normalize discord dispatch"
                );
            }
        }
    }
}
