//! Routes normalised inbound events to the ticket manager, the staff query flow and the panel.
//!
//! Every handler answers at its own boundary: domain failures become ephemeral replies built
//! from the response templates, and failures to deliver a reply are logged.

use std::sync::Arc;

use concierge_core::{
    controls, fill_placeholders, ContentTemplates, InteractionResponse, OutboundMessage,
    PlatformApi,
};
use concierge_tickets::TicketLifecycleManager;
use tracing::{debug, info, warn};

use crate::{
    inbound_events::{InboundEvent, InboundMessage, InteractionContext},
    panel_publisher::PanelPublisher,
    staff_query::StaffQueryFlow,
    ticket_commands::{parse_ticket_command, TicketCommand},
};

pub struct EventRouter {
    platform: Arc<dyn PlatformApi>,
    templates: Arc<ContentTemplates>,
    tickets: Arc<TicketLifecycleManager>,
    panel: Arc<PanelPublisher>,
    staff_query: Arc<StaffQueryFlow>,
    guild_id: String,
    command_prefix: String,
}

impl EventRouter {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        templates: Arc<ContentTemplates>,
        tickets: Arc<TicketLifecycleManager>,
        panel: Arc<PanelPublisher>,
        staff_query: Arc<StaffQueryFlow>,
        guild_id: impl Into<String>,
        command_prefix: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            templates,
            tickets,
            panel,
            staff_query,
            guild_id: guild_id.into(),
            command_prefix: command_prefix.into(),
        }
    }

    pub async fn dispatch(&self, event: InboundEvent) {
        match event {
            InboundEvent::ButtonActivated { context, custom_id } => {
                if self.is_foreign_guild(context.guild_id.as_deref()) {
                    return;
                }
                self.handle_button(&context, &custom_id).await;
            }
            InboundEvent::ModalSubmitted {
                context,
                custom_id,
                fields,
            } => {
                if self.is_foreign_guild(context.guild_id.as_deref()) {
                    return;
                }
                if custom_id != controls::STAFF_QUERY_MODAL {
                    debug!(custom_id = %custom_id, "ignoring unknown modal");
                    return;
                }
                let raw_id = fields
                    .get(controls::STAFF_ID_INPUT)
                    .map(String::as_str)
                    .unwrap_or_default();
                self.handle_staff_query(&context, raw_id).await;
            }
            InboundEvent::PlainMessage(message) => self.handle_message(&message).await,
        }
    }

    fn is_foreign_guild(&self, guild_id: Option<&str>) -> bool {
        guild_id.is_some_and(|guild_id| guild_id != self.guild_id)
    }

    async fn handle_button(&self, context: &InteractionContext, custom_id: &str) {
        let caller = &context.caller;
        let reply = match custom_id {
            controls::CREATE_TICKET => match self.tickets.create(&caller.user).await {
                Ok(handle) => {
                    let channel = handle.mention();
                    fill_placeholders(
                        &self.templates.responses.ticket_created,
                        &[("channel", channel.as_str())],
                    )
                }
                Err(error) => {
                    info!(user_id = %caller.user.id, error = %error, "ticket creation refused");
                    error.response_text(&self.templates)
                }
            },
            controls::HANDLE_TICKET => {
                match self.tickets.claim(&context.channel_id, caller).await {
                    Ok(_) => self.templates.responses.ticket_claimed.clone(),
                    Err(error) => {
                        info!(
                            channel_id = %context.channel_id,
                            user_id = %caller.user.id,
                            error = %error,
                            "ticket claim refused"
                        );
                        error.response_text(&self.templates)
                    }
                }
            }
            controls::CLOSE_TICKET => {
                match self.tickets.close(&context.channel_id, caller).await {
                    Ok(closed) => {
                        let seconds = closed.grace.as_secs().to_string();
                        fill_placeholders(
                            &self.templates.responses.ticket_closing,
                            &[("seconds", seconds.as_str())],
                        )
                    }
                    Err(error) => {
                        info!(
                            channel_id = %context.channel_id,
                            user_id = %caller.user.id,
                            error = %error,
                            "ticket close refused"
                        );
                        error.response_text(&self.templates)
                    }
                }
            }
            controls::QUERY_STAFF => {
                self.open_staff_query(context).await;
                return;
            }
            other => {
                debug!(custom_id = other, "ignoring unknown control");
                return;
            }
        };
        self.reply(context, OutboundMessage::ephemeral_text(reply))
            .await;
    }

    async fn open_staff_query(&self, context: &InteractionContext) {
        if let Err(error) = self
            .platform
            .respond_to_interaction(&context.interaction, &self.staff_query.open_form())
            .await
        {
            warn!(error = %error, "staff query form could not be opened");
            self.reply(
                context,
                OutboundMessage::ephemeral_text(&self.templates.responses.modal_error),
            )
            .await;
        }
    }

    async fn handle_staff_query(&self, context: &InteractionContext, raw_id: &str) {
        let reply = self.staff_query.submit(raw_id).await;
        if let Err(error) = self
            .platform
            .respond_to_interaction(&context.interaction, &InteractionResponse::Message(reply))
            .await
        {
            warn!(error = %error, "staff query reply failed");
            self.reply(
                context,
                OutboundMessage::ephemeral_text(&self.templates.responses.query_error),
            )
            .await;
        }
    }

    async fn handle_message(&self, message: &InboundMessage) {
        if message.author.bot || self.is_foreign_guild(message.guild_id.as_deref()) {
            return;
        }
        let Some(command) = parse_ticket_command(&self.command_prefix, &message.content) else {
            return;
        };
        match command {
            TicketCommand::PublishPanel => {
                let text = match self.panel.publish().await {
                    Ok(_) => &self.templates.responses.panel_updated,
                    Err(error) => {
                        warn!(user_id = %message.author.id, error = %error, "panel publish failed");
                        &self.templates.responses.panel_update_error
                    }
                };
                let mut reply = OutboundMessage::text(text);
                reply.reply_to = Some(message.id.clone());
                if let Err(error) = self.platform.send_message(&message.channel_id, &reply).await {
                    warn!(channel_id = %message.channel_id, error = %error, "command reply failed");
                }
            }
        }
    }

    async fn reply(&self, context: &InteractionContext, message: OutboundMessage) {
        if let Err(error) = self
            .platform
            .respond_to_interaction(&context.interaction, &InteractionResponse::Message(message))
            .await
        {
            warn!(
                channel_id = %context.channel_id,
                error = %error,
                "interaction reply failed"
            );
        }
    }
}
