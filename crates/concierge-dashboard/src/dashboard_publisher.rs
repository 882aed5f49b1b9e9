//! Find-or-send publisher for the single management dashboard message.
//!
//! The dashboard is identified by author (this bot) and first embed title inside the most
//! recent `search_window` messages of the management channel. A match is edited in place,
//! otherwise a new message is sent. Refreshes inside one process are serialised so two of
//! them cannot both miss the lookup and send duplicates.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use concierge_analytics::{Leaderboard, StaffAnalyticsAggregator};
use concierge_core::{
    controls, current_rfc3339_timestamp, ButtonSpec, ButtonStyle, ContentTemplates, HistoryQuery,
    OutboundMessage, PlatformApi, PlatformGuild, PlatformMessage, PlatformResult,
};
use concierge_tickets::TicketLifecycleManager;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dashboard_render::{format_uptime, render_leaderboard};

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Profile captured at startup; used when a fresh guild lookup fails.
    pub guild: PlatformGuild,
    pub bot_user_id: String,
    pub management_channel_id: String,
    pub staff_log_channel_id: String,
    pub search_window: usize,
    pub top_n: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub guild_name: String,
    pub guild_icon_url: Option<String>,
    pub active_tickets: usize,
    pub member_count: Option<u64>,
    pub top_staff: Leaderboard,
    pub uptime: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Edited { message_id: String },
    Sent { message_id: String },
}

impl RefreshOutcome {
    pub fn message_id(&self) -> &str {
        match self {
            Self::Edited { message_id } | Self::Sent { message_id } => message_id,
        }
    }
}

pub struct DashboardPublisher {
    platform: Arc<dyn PlatformApi>,
    templates: Arc<ContentTemplates>,
    tickets: Arc<TicketLifecycleManager>,
    analytics: Arc<StaffAnalyticsAggregator>,
    config: DashboardConfig,
    started_at: Instant,
    refresh_lock: Mutex<()>,
}

impl DashboardPublisher {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        templates: Arc<ContentTemplates>,
        tickets: Arc<TicketLifecycleManager>,
        analytics: Arc<StaffAnalyticsAggregator>,
        config: DashboardConfig,
        started_at: Instant,
    ) -> Self {
        Self {
            platform,
            templates,
            tickets,
            analytics,
            config,
            started_at,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let guild = match self.platform.guild(&self.config.guild.id).await {
            Ok(guild) => guild,
            Err(error) => {
                warn!(guild_id = %self.config.guild.id, error = %error, "dashboard guild lookup failed");
                self.config.guild.clone()
            }
        };
        let top_staff = self
            .analytics
            .compute_top_staff(&self.config.staff_log_channel_id, self.config.top_n)
            .await;
        DashboardSnapshot {
            guild_name: guild.name,
            guild_icon_url: guild.icon_url,
            active_tickets: self.tickets.active_count(),
            member_count: guild.member_count.or(self.config.guild.member_count),
            top_staff,
            uptime: self.started_at.elapsed(),
        }
    }

    pub fn render(&self, snapshot: &DashboardSnapshot) -> OutboundMessage {
        let active_tickets = snapshot.active_tickets.to_string();
        let total_users = snapshot
            .member_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "?".to_string());
        let top_staff = render_leaderboard(&snapshot.top_staff, &self.templates.responses);
        let uptime = format_uptime(snapshot.uptime);
        let icon_url = snapshot.guild_icon_url.as_deref();
        let embed = self
            .templates
            .management
            .render(&[
                ("guildName", snapshot.guild_name.as_str()),
                ("activeTickets", active_tickets.as_str()),
                ("totalUsers", total_users.as_str()),
                ("topStaff", top_staff.as_str()),
                ("uptime", uptime.as_str()),
            ])
            .with_thumbnail(icon_url)
            .with_footer(self.templates.footer_for(&snapshot.guild_name), icon_url)
            .with_timestamp(current_rfc3339_timestamp());
        OutboundMessage::embed(embed).with_buttons(vec![ButtonSpec::new(
            controls::QUERY_STAFF,
            &self.templates.buttons.query_staff,
            ButtonStyle::Secondary,
            Some("🔍"),
        )])
    }

    /// Edits the existing dashboard or sends a new one.
    pub async fn refresh(&self) -> PlatformResult<RefreshOutcome> {
        let _serialized = self.refresh_lock.lock().await;
        let channel_id = self.config.management_channel_id.as_str();
        let recent = self
            .platform
            .fetch_messages(channel_id, &HistoryQuery::latest(self.config.search_window))
            .await?;
        let existing = self.find_dashboard(&recent).map(|message| message.id.clone());

        let snapshot = self.snapshot().await;
        let message = self.render(&snapshot);
        let outcome = match existing {
            Some(message_id) => {
                self.platform
                    .edit_message(channel_id, &message_id, &message)
                    .await?;
                RefreshOutcome::Edited { message_id }
            }
            None => {
                let sent = self.platform.send_message(channel_id, &message).await?;
                info!(channel_id, message_id = %sent.id, "dashboard message sent");
                RefreshOutcome::Sent { message_id: sent.id }
            }
        };
        debug!(
            channel_id,
            message_id = %outcome.message_id(),
            active_tickets = snapshot.active_tickets,
            "dashboard refreshed"
        );
        Ok(outcome)
    }

    fn find_dashboard<'a>(&self, recent: &'a [PlatformMessage]) -> Option<&'a PlatformMessage> {
        let title = self.templates.management.title.as_str();
        recent.iter().find(|message| {
            message.author_id == self.config.bot_user_id && message.first_embed_title() == Some(title)
        })
    }
}
