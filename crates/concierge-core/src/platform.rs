//! Abstract messaging-platform contract consumed by the ticket, analytics and dashboard layers.
//!
//! The core never talks to a concrete transport. It depends on [`PlatformApi`] for every
//! outbound operation (channels, messages, history pages, identity lookups and interaction
//! replies) and exchanges plain value types with it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Failure reported by a [`PlatformApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The addressed channel, message, user or guild does not exist or is not visible.
    #[error("{resource} '{id}' is not reachable")]
    NotFound { resource: &'static str, id: String },
    /// The transport call itself failed (status, network, decode).
    #[error("platform {operation} failed: {detail}")]
    Transport { operation: String, detail: String },
}

impl PlatformError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn transport(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Category,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformChannel {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl PlatformChannel {
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl PlatformUser {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            global_name: None,
            bot: false,
        }
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Human-readable tag: the global display name when set, otherwise the username.
    pub fn tag(&self) -> &str {
        self.global_name
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.username.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformGuild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// A message as read back from channel history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMessage {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embed_titles: Vec<String>,
}

impl PlatformMessage {
    pub fn first_embed_title(&self) -> Option<&str> {
        self.embed_titles.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmbed {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<u32>,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
    #[serde(default)]
    pub footer: Option<String>,
    #[serde(default)]
    pub footer_icon_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl OutboundEmbed {
    pub fn with_footer(mut self, text: impl Into<String>, icon_url: Option<&str>) -> Self {
        self.footer = Some(text.into());
        self.footer_icon_url = icon_url.map(str::to_string);
        self
    }

    pub fn with_thumbnail(mut self, url: Option<&str>) -> Self {
        self.thumbnail_url = url.map(str::to_string);
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    #[serde(default)]
    pub emoji: Option<String>,
}

impl ButtonSpec {
    pub fn new(
        custom_id: impl Into<String>,
        label: impl Into<String>,
        style: ButtonStyle,
        emoji: Option<&str>,
    ) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
            emoji: emoji.map(str::to_string),
        }
    }
}

/// Message body for send, edit and interaction replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub embeds: Vec<OutboundEmbed>,
    #[serde(default)]
    pub buttons: Vec<ButtonSpec>,
    /// Message id this message replies to, when supported by the transport.
    #[serde(default)]
    pub reply_to: Option<String>,
    /// Only honoured for interaction replies: visible to the invoking user alone.
    #[serde(default)]
    pub ephemeral: bool,
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn ephemeral_text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ephemeral: true,
            ..Self::default()
        }
    }

    pub fn embed(embed: OutboundEmbed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<ButtonSpec>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Creation request for a private ticket conversation channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketChannelRequest {
    pub name: String,
    pub topic: String,
    pub parent_id: String,
    pub owner_id: String,
    pub staff_role_ids: Vec<String>,
}

/// One page request against a channel's message history, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: usize,
    pub before: Option<String>,
}

impl HistoryQuery {
    pub fn latest(limit: usize) -> Self {
        Self {
            limit,
            before: None,
        }
    }
}

/// Identity of an inbound interaction, needed to answer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRef {
    pub id: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalInput {
    pub custom_id: String,
    pub label: String,
    #[serde(default)]
    pub placeholder: Option<String>,
    pub required: bool,
    #[serde(default)]
    pub min_length: Option<u16>,
    #[serde(default)]
    pub max_length: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalForm {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<ModalInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionResponse {
    Message(OutboundMessage),
    Modal(ModalForm),
}

/// Outbound operations the core needs from the messaging platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn current_user(&self) -> PlatformResult<PlatformUser>;

    async fn guild(&self, guild_id: &str) -> PlatformResult<PlatformGuild>;

    async fn guild_channels(&self, guild_id: &str) -> PlatformResult<Vec<PlatformChannel>>;

    async fn user(&self, user_id: &str) -> PlatformResult<PlatformUser>;

    async fn create_ticket_channel(
        &self,
        guild_id: &str,
        request: &TicketChannelRequest,
    ) -> PlatformResult<PlatformChannel>;

    async fn delete_channel(&self, channel_id: &str) -> PlatformResult<()>;

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutboundMessage,
    ) -> PlatformResult<PlatformMessage>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        message: &OutboundMessage,
    ) -> PlatformResult<PlatformMessage>;

    async fn delete_messages(&self, channel_id: &str, message_ids: &[String])
        -> PlatformResult<()>;

    /// Returns at most `query.limit` messages, newest first, strictly older than `query.before`.
    async fn fetch_messages(
        &self,
        channel_id: &str,
        query: &HistoryQuery,
    ) -> PlatformResult<Vec<PlatformMessage>>;

    async fn respond_to_interaction(
        &self,
        interaction: &InteractionRef,
        response: &InteractionResponse,
    ) -> PlatformResult<()>;
}
