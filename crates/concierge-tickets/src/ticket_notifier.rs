//! Posts ticket lifecycle entries to the ticket log and staff log channels.
//!
//! Claim entries carry the handling staff member's mention as the first mention of the
//! message; the staff leaderboard is computed from exactly that convention.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use concierge_core::{
    current_rfc3339_timestamp, current_unix_timestamp, fill_placeholders, mention_of,
    timestamp_markup, ContentTemplates, OutboundEmbed, OutboundMessage, PlatformApi,
    PlatformGuild, PlatformUser,
};
use tracing::debug;

use crate::{
    ticket_events::{TicketEvent, TicketEventSink},
    ticket_registry::Ticket,
};

pub struct TicketLogNotifier {
    platform: Arc<dyn PlatformApi>,
    templates: Arc<ContentTemplates>,
    guild: PlatformGuild,
    ticket_log_channel_id: String,
    staff_log_channel_id: String,
}

impl TicketLogNotifier {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        templates: Arc<ContentTemplates>,
        guild: PlatformGuild,
        ticket_log_channel_id: impl Into<String>,
        staff_log_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            templates,
            guild,
            ticket_log_channel_id: ticket_log_channel_id.into(),
            staff_log_channel_id: staff_log_channel_id.into(),
        }
    }

    fn decorate(&self, embed: OutboundEmbed) -> OutboundEmbed {
        embed
            .with_footer(
                self.templates.footer_for(&self.guild.name),
                self.guild.icon_url.as_deref(),
            )
            .with_timestamp(current_rfc3339_timestamp())
    }

    fn created_entry(&self, ticket: &Ticket, owner: &PlatformUser) -> OutboundMessage {
        let user = owner.mention();
        let channel = format!("<#{}>", ticket.channel_id);
        let timestamp = timestamp_markup(ticket.created_unix_ms / 1_000);
        OutboundMessage::embed(self.decorate(self.templates.log_ticket_created.render(&[
            ("user", user.as_str()),
            ("userTag", owner.tag()),
            ("userId", owner.id.as_str()),
            ("channel", channel.as_str()),
            ("channelId", ticket.channel_id.as_str()),
            ("timestamp", timestamp.as_str()),
        ])))
    }

    fn closed_entry(&self, ticket: &Ticket, closed_by: &PlatformUser) -> OutboundMessage {
        let user = mention_of(&ticket.owner_id);
        let closer = closed_by.mention();
        let timestamp = timestamp_markup(current_unix_timestamp());
        OutboundMessage::embed(self.decorate(self.templates.log_ticket_closed.render(&[
            ("user", user.as_str()),
            ("userTag", ticket.owner_tag.as_str()),
            ("userId", ticket.owner_id.as_str()),
            ("channelName", ticket.channel_name.as_str()),
            ("channelId", ticket.channel_id.as_str()),
            ("closedBy", closer.as_str()),
            ("closedByTag", closed_by.tag()),
            ("closedById", closed_by.id.as_str()),
            ("timestamp", timestamp.as_str()),
        ])))
    }

    fn claimed_entry(&self, ticket: &Ticket, staff: &PlatformUser) -> OutboundMessage {
        let handled_by = staff.mention();
        let user = mention_of(&ticket.owner_id);
        let content = fill_placeholders(
            &self.templates.claim_log_content,
            &[("handledBy", handled_by.as_str())],
        );
        OutboundMessage::embed(self.decorate(self.templates.log_ticket_claimed.render(&[
            ("handledBy", handled_by.as_str()),
            ("handledByTag", staff.tag()),
            ("handledById", staff.id.as_str()),
            ("user", user.as_str()),
            ("userId", ticket.owner_id.as_str()),
        ])))
        .with_content(content)
    }
}

#[async_trait]
impl TicketEventSink for TicketLogNotifier {
    fn name(&self) -> &'static str {
        "ticket_log_notifier"
    }

    async fn handle(&self, event: &TicketEvent) -> Result<()> {
        let (channel_id, message) = match event {
            TicketEvent::Created { ticket, owner } => {
                (&self.ticket_log_channel_id, self.created_entry(ticket, owner))
            }
            TicketEvent::Closed { ticket, closed_by } => {
                (&self.ticket_log_channel_id, self.closed_entry(ticket, closed_by))
            }
            TicketEvent::Claimed { ticket, staff } => {
                (&self.staff_log_channel_id, self.claimed_entry(ticket, staff))
            }
        };
        self.platform
            .send_message(channel_id, &message)
            .await
            .with_context(|| format!("failed to post {} log entry", event.kind()))?;
        debug!(
            kind = event.kind(),
            channel_id = %event.ticket().channel_id,
            log_channel_id = %channel_id,
            "ticket log entry posted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use concierge_core::{
        first_mention, testing::InMemoryPlatform, ChannelKind, ContentTemplates, PlatformGuild,
        PlatformUser,
    };

    use super::TicketLogNotifier;
    use crate::{
        ticket_events::{TicketEvent, TicketEventSink},
        ticket_registry::Ticket,
    };

    const TICKET_LOG: &str = "800000000000000001";
    const STAFF_LOG: &str = "800000000000000002";
    const STAFF_ID: &str = "500000000000000001";

    fn setup() -> (Arc<InMemoryPlatform>, TicketLogNotifier) {
        let platform = Arc::new(InMemoryPlatform::new("1", "2"));
        platform.add_channel(TICKET_LOG, "ticket-log", ChannelKind::Text);
        platform.add_channel(STAFF_LOG, "staff-log", ChannelKind::Text);
        let notifier = TicketLogNotifier::new(
            platform.clone(),
            Arc::new(ContentTemplates::default()),
            PlatformGuild {
                id: "1".to_string(),
                name: "Test Guild".to_string(),
                member_count: None,
                icon_url: None,
            },
            TICKET_LOG,
            STAFF_LOG,
        );
        (platform, notifier)
    }

    fn ticket() -> Ticket {
        Ticket {
            channel_id: "700000000000000001".to_string(),
            channel_name: "ticket-alice".to_string(),
            owner_id: "400000000000000001".to_string(),
            owner_tag: "alice".to_string(),
            created_unix_ms: 1_700_000_000_000,
            claimed_by: None,
        }
    }

    #[tokio::test]
    async fn functional_claim_entry_leads_with_staff_mention_in_staff_log() {
        let (platform, notifier) = setup();
        notifier
            .handle(&TicketEvent::Claimed {
                ticket: ticket(),
                staff: PlatformUser::new(STAFF_ID, "helper"),
            })
            .await
            .expect("claim entry");

        let entries = platform.messages_in(STAFF_LOG);
        assert_eq!(entries.len(), 1);
        assert_eq!(first_mention(&entries[0].content), Some(STAFF_ID));
        assert!(platform.messages_in(TICKET_LOG).is_empty());
    }

    #[tokio::test]
    async fn functional_created_and_closed_entries_go_to_ticket_log() {
        let (platform, notifier) = setup();
        let owner = PlatformUser::new("400000000000000001", "alice");
        notifier
            .handle(&TicketEvent::Created {
                ticket: ticket(),
                owner: owner.clone(),
            })
            .await
            .expect("created entry");
        notifier
            .handle(&TicketEvent::Closed {
                ticket: ticket(),
                closed_by: owner,
            })
            .await
            .expect("closed entry");

        let titles = platform
            .messages_in(TICKET_LOG)
            .iter()
            .filter_map(|message| message.first_embed_title().map(str::to_string))
            .collect::<Vec<_>>();
        let templates = ContentTemplates::default();
        assert_eq!(
            titles,
            vec![
                templates.log_ticket_created.title.clone(),
                templates.log_ticket_closed.title.clone()
            ]
        );
    }

    #[tokio::test]
    async fn regression_unreachable_log_channel_surfaces_error() {
        let (platform, notifier) = setup();
        platform.make_channel_unreachable(TICKET_LOG);
        let error = notifier
            .handle(&TicketEvent::Created {
                ticket: ticket(),
                owner: PlatformUser::new("400000000000000001", "alice"),
            })
            .await
            .expect_err("unreachable");
        assert!(format!("{error:#}").contains("created log entry"));
    }
}
