//! Ticket creation, claiming and closing against the platform contract.
//!
//! [`TicketLifecycleManager`] is the only writer of the ticket registry. Each operation checks
//! its preconditions in a fixed order, performs the platform side effects, and publishes a
//! [`TicketEvent`] once the transition is committed. Notices posted into the ticket channel are
//! best effort: their failure is logged and does not undo the transition.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use concierge_core::{
    controls, current_rfc3339_timestamp, current_unix_timestamp, current_unix_timestamp_ms,
    mention_of, relative_timestamp_markup, ButtonSpec, ButtonStyle, ChannelKind, ContentTemplates,
    OutboundEmbed, OutboundMessage, PlatformApi, PlatformChannel, PlatformGuild, PlatformUser,
    TicketChannelRequest,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    ticket_errors::TicketError,
    ticket_events::{TicketEvent, TicketEventBus},
    ticket_registry::{Ticket, TicketRegistry},
};

const TICKET_CHANNEL_PREFIX: &str = "ticket-";
const TICKET_TOPIC_PREFIX: &str = "Ticket for ";
const MAX_CHANNEL_NAME_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct TicketLifecycleConfig {
    pub guild: PlatformGuild,
    pub ticket_category_id: String,
    pub support_role_id: String,
    pub staff_role_id: String,
    pub max_tickets_per_user: usize,
    pub close_grace: Duration,
}

/// The user invoking a claim or close, with the authority the platform reported for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user: PlatformUser,
    pub role_ids: Vec<String>,
    pub is_admin: bool,
}

impl Caller {
    pub fn has_role(&self, role_id: &str) -> bool {
        !role_id.is_empty() && self.role_ids.iter().any(|candidate| candidate == role_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketHandle {
    pub channel_id: String,
    pub channel_name: String,
}

impl TicketHandle {
    pub fn mention(&self) -> String {
        format!("<#{}>", self.channel_id)
    }
}

/// Result of a successful close. `deletion` completes once the delayed channel removal ran.
#[derive(Debug)]
pub struct ClosedTicket {
    pub ticket: Ticket,
    pub grace: Duration,
    pub deletion: JoinHandle<()>,
}

/// Channel name for a requester's ticket: `ticket-` plus the lowercased username with
/// anything outside `[a-z0-9_-]` collapsed to `-`.
pub fn ticket_channel_name(username: &str) -> String {
    let mut sanitized = String::with_capacity(username.len());
    for ch in username.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            sanitized.push(ch);
        } else if !sanitized.ends_with('-') {
            sanitized.push('-');
        }
    }
    let sanitized = sanitized.trim_matches('-');
    let body = if sanitized.is_empty() { "user" } else { sanitized };
    format!("{TICKET_CHANNEL_PREFIX}{body}")
        .chars()
        .take(MAX_CHANNEL_NAME_CHARS)
        .collect()
}

pub fn ticket_channel_topic(owner_id: &str) -> String {
    format!("{TICKET_TOPIC_PREFIX}{owner_id}")
}

pub struct TicketLifecycleManager {
    platform: Arc<dyn PlatformApi>,
    templates: Arc<ContentTemplates>,
    config: TicketLifecycleConfig,
    registry: TicketRegistry,
    events: TicketEventBus,
}

impl TicketLifecycleManager {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        templates: Arc<ContentTemplates>,
        config: TicketLifecycleConfig,
    ) -> Self {
        Self {
            platform,
            templates,
            config,
            registry: TicketRegistry::new(),
            events: TicketEventBus::default(),
        }
    }

    pub fn events(&self) -> &TicketEventBus {
        &self.events
    }

    pub fn config(&self) -> &TicketLifecycleConfig {
        &self.config
    }

    pub fn templates(&self) -> &ContentTemplates {
        &self.templates
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    pub fn ticket(&self, channel_id: &str) -> Option<Ticket> {
        self.registry.get(channel_id)
    }

    /// Opens a private ticket channel for `requester`.
    ///
    /// Checks run in order: per-user limit, an existing untracked ticket channel for the
    /// requester, then the configured category.
    pub async fn create(&self, requester: &PlatformUser) -> Result<TicketHandle, TicketError> {
        let reservation = self
            .registry
            .reserve_slot(&requester.id, self.config.max_tickets_per_user)?;

        let channels = self.platform.guild_channels(&self.config.guild.id).await?;
        if let Some(existing) = self.find_untracked_ticket_channel(&channels, requester) {
            return Err(TicketError::DuplicateTicket {
                channel_id: existing.id.clone(),
            });
        }
        let category_present = !self.config.ticket_category_id.is_empty()
            && channels.iter().any(|channel| {
                channel.id == self.config.ticket_category_id && channel.kind == ChannelKind::Category
            });
        if !category_present {
            return Err(TicketError::ConfigurationMissing {
                item: "ticket category".to_string(),
            });
        }

        let request = TicketChannelRequest {
            name: ticket_channel_name(&requester.username),
            topic: ticket_channel_topic(&requester.id),
            parent_id: self.config.ticket_category_id.clone(),
            owner_id: requester.id.clone(),
            staff_role_ids: self.staff_role_ids(),
        };
        let channel = self
            .platform
            .create_ticket_channel(&self.config.guild.id, &request)
            .await?;

        let ticket = Ticket {
            channel_id: channel.id.clone(),
            channel_name: channel.name.clone(),
            owner_id: requester.id.clone(),
            owner_tag: requester.tag().to_string(),
            created_unix_ms: current_unix_timestamp_ms(),
            claimed_by: None,
        };
        reservation.commit(ticket.clone());
        info!(
            channel_id = %ticket.channel_id,
            owner_id = %ticket.owner_id,
            active = self.registry.len(),
            "ticket created"
        );

        if let Err(error) = self
            .platform
            .send_message(&channel.id, &self.welcome_message(requester))
            .await
        {
            warn!(channel_id = %channel.id, error = %error, "ticket welcome message failed");
        }

        self.events.emit(TicketEvent::Created {
            ticket,
            owner: requester.clone(),
        });
        Ok(TicketHandle {
            channel_id: channel.id,
            channel_name: channel.name,
        })
    }

    /// Marks the ticket in `channel_id` as handled by `caller`. At most one claim succeeds.
    pub async fn claim(&self, channel_id: &str, caller: &Caller) -> Result<Ticket, TicketError> {
        let authorized = caller.is_admin || caller.has_role(&self.config.support_role_id);
        let ticket = self.registry.claim(channel_id, &caller.user.id, authorized)?;
        info!(channel_id, staff_id = %caller.user.id, "ticket claimed");

        if let Err(error) = self
            .platform
            .send_message(channel_id, &self.claim_notice(&caller.user))
            .await
        {
            warn!(channel_id, error = %error, "ticket claim notice failed");
        }

        self.events.emit(TicketEvent::Claimed {
            ticket: ticket.clone(),
            staff: caller.user.clone(),
        });
        Ok(ticket)
    }

    /// Closes the ticket in `channel_id` when `caller` owns it or is an administrator. The
    /// ticket leaves the registry immediately; the channel is deleted after the grace period.
    pub async fn close(&self, channel_id: &str, caller: &Caller) -> Result<ClosedTicket, TicketError> {
        let ticket = self.registry.remove_if(channel_id, |ticket| {
            caller.is_admin || ticket.owner_id == caller.user.id
        })?;
        info!(
            channel_id,
            closed_by = %caller.user.id,
            active = self.registry.len(),
            "ticket closed"
        );

        if let Err(error) = self
            .platform
            .send_message(channel_id, &self.close_notice(&caller.user))
            .await
        {
            warn!(channel_id, error = %error, "ticket close notice failed");
        }

        self.events.emit(TicketEvent::Closed {
            ticket: ticket.clone(),
            closed_by: caller.user.clone(),
        });
        let deletion = self.schedule_channel_deletion(channel_id);
        Ok(ClosedTicket {
            ticket,
            grace: self.config.close_grace,
            deletion,
        })
    }

    fn schedule_channel_deletion(&self, channel_id: &str) -> JoinHandle<()> {
        let platform = Arc::clone(&self.platform);
        let grace = self.config.close_grace;
        let channel_id = channel_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            match platform.delete_channel(&channel_id).await {
                Ok(()) => info!(channel_id = %channel_id, "ticket channel deleted"),
                Err(error) => {
                    warn!(channel_id = %channel_id, error = %error, "ticket channel deletion failed")
                }
            }
        })
    }

    fn find_untracked_ticket_channel<'a>(
        &self,
        channels: &'a [PlatformChannel],
        requester: &PlatformUser,
    ) -> Option<&'a PlatformChannel> {
        let expected_name = ticket_channel_name(&requester.username);
        let expected_topic = ticket_channel_topic(&requester.id);
        channels.iter().find(|channel| {
            let matches_convention = channel.name == expected_name
                || channel.topic.as_deref() == Some(expected_topic.as_str());
            matches_convention && self.registry.get(&channel.id).is_none()
        })
    }

    fn staff_role_ids(&self) -> Vec<String> {
        [&self.config.support_role_id, &self.config.staff_role_id]
            .into_iter()
            .filter(|role_id| !role_id.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn decorate(&self, embed: OutboundEmbed) -> OutboundEmbed {
        let guild = &self.config.guild;
        embed
            .with_footer(
                self.templates.footer_for(&guild.name),
                guild.icon_url.as_deref(),
            )
            .with_timestamp(current_rfc3339_timestamp())
    }

    fn welcome_message(&self, requester: &PlatformUser) -> OutboundMessage {
        let user = requester.mention();
        let embed = self.decorate(self.templates.ticket_welcome.render(&[("user", user.as_str())]));
        let buttons = vec![
            ButtonSpec::new(
                controls::HANDLE_TICKET,
                &self.templates.buttons.claim_ticket,
                ButtonStyle::Success,
                Some("✅"),
            ),
            ButtonSpec::new(
                controls::CLOSE_TICKET,
                &self.templates.buttons.close_ticket,
                ButtonStyle::Danger,
                Some("❌"),
            ),
        ];
        let message = OutboundMessage::embed(embed).with_buttons(buttons);
        if self.config.staff_role_id.is_empty() {
            message
        } else {
            message.with_content(format!("<@&{}>", self.config.staff_role_id))
        }
    }

    fn claim_notice(&self, staff: &PlatformUser) -> OutboundMessage {
        let staff = mention_of(&staff.id);
        let timestamp = relative_timestamp_markup(current_unix_timestamp());
        OutboundMessage::embed(self.decorate(self.templates.ticket_claimed.render(&[
            ("staff", staff.as_str()),
            ("timestamp", timestamp.as_str()),
        ])))
    }

    fn close_notice(&self, closed_by: &PlatformUser) -> OutboundMessage {
        let user = closed_by.mention();
        OutboundMessage::embed(self.decorate(self.templates.ticket_close.render(&[("user", user.as_str())])))
    }
}
