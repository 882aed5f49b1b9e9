//! Entry panel: the message carrying the `create_ticket` button.

use std::sync::Arc;

use concierge_core::{
    controls, current_rfc3339_timestamp, ButtonSpec, ButtonStyle, ContentTemplates, HistoryQuery,
    OutboundMessage, PlatformApi, PlatformGuild, PlatformMessage, PlatformResult,
};
use tracing::info;

const PANEL_CLEANUP_WINDOW: usize = 100;

pub struct PanelPublisher {
    platform: Arc<dyn PlatformApi>,
    templates: Arc<ContentTemplates>,
    guild: PlatformGuild,
    bot_user_id: String,
    panel_channel_id: String,
}

impl PanelPublisher {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        templates: Arc<ContentTemplates>,
        guild: PlatformGuild,
        bot_user_id: impl Into<String>,
        panel_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            templates,
            guild,
            bot_user_id: bot_user_id.into(),
            panel_channel_id: panel_channel_id.into(),
        }
    }

    pub fn render(&self) -> OutboundMessage {
        let guild_name = self.guild.name.as_str();
        let embed = self
            .templates
            .panel
            .render(&[("guildName", guild_name)])
            .with_thumbnail(self.guild.icon_url.as_deref())
            .with_footer(
                self.templates.footer_for(guild_name),
                self.guild.icon_url.as_deref(),
            )
            .with_timestamp(current_rfc3339_timestamp());
        OutboundMessage::embed(embed).with_buttons(vec![ButtonSpec::new(
            controls::CREATE_TICKET,
            &self.templates.buttons.create_ticket,
            ButtonStyle::Primary,
            Some("🎫"),
        )])
    }

    /// Removes this bot's earlier messages from the panel channel, then posts a fresh panel.
    pub async fn publish(&self) -> PlatformResult<PlatformMessage> {
        let recent = self
            .platform
            .fetch_messages(
                &self.panel_channel_id,
                &HistoryQuery::latest(PANEL_CLEANUP_WINDOW),
            )
            .await?;
        let stale = recent
            .into_iter()
            .filter(|message| message.author_id == self.bot_user_id)
            .map(|message| message.id)
            .collect::<Vec<_>>();
        if !stale.is_empty() {
            self.platform
                .delete_messages(&self.panel_channel_id, &stale)
                .await?;
        }
        let posted = self
            .platform
            .send_message(&self.panel_channel_id, &self.render())
            .await?;
        info!(
            channel_id = %self.panel_channel_id,
            removed = stale.len(),
            "ticket panel published"
        );
        Ok(posted)
    }
}
