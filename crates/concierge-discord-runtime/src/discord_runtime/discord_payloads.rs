//! Discord REST/gateway JSON shapes and their mapping to platform types.

use concierge_core::{
    ButtonSpec, ButtonStyle, ChannelKind, InteractionResponse, ModalForm, OutboundEmbed,
    OutboundMessage, PlatformChannel, PlatformGuild, PlatformMessage, PlatformUser,
    TicketChannelRequest,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const DISCORD_CDN_BASE: &str = "https://cdn.discordapp.com";
const CHANNEL_TYPE_GUILD_TEXT: u8 = 0;
const CHANNEL_TYPE_GUILD_CATEGORY: u8 = 4;
const OVERWRITE_TYPE_ROLE: u8 = 0;
const OVERWRITE_TYPE_MEMBER: u8 = 1;
const PERMISSION_VIEW_CHANNEL: u64 = 1 << 10;
const PERMISSION_SEND_MESSAGES: u64 = 1 << 11;
const PERMISSION_READ_MESSAGE_HISTORY: u64 = 1 << 16;
pub(crate) const PERMISSION_ADMINISTRATOR: u64 = 1 << 3;
const MESSAGE_FLAG_EPHEMERAL: u64 = 1 << 6;
const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const COMPONENT_TEXT_INPUT: u8 = 4;
const TEXT_INPUT_SHORT: u8 = 1;
const CALLBACK_CHANNEL_MESSAGE: u8 = 4;
const CALLBACK_MODAL: u8 = 9;
const MAX_BUTTONS_PER_ROW: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DiscordUser {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) username: String,
    #[serde(default)]
    pub(crate) global_name: Option<String>,
    #[serde(default)]
    pub(crate) bot: bool,
}

impl From<DiscordUser> for PlatformUser {
    fn from(user: DiscordUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            global_name: user.global_name,
            bot: user.bot,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DiscordChannel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
}

impl From<DiscordChannel> for PlatformChannel {
    fn from(channel: DiscordChannel) -> Self {
        let kind = match channel.kind {
            CHANNEL_TYPE_GUILD_TEXT => ChannelKind::Text,
            CHANNEL_TYPE_GUILD_CATEGORY => ChannelKind::Category,
            _ => ChannelKind::Other,
        };
        Self {
            id: channel.id,
            name: channel.name.unwrap_or_default(),
            kind,
            topic: channel.topic,
            parent_id: channel.parent_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DiscordGuild {
    id: String,
    name: String,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    approximate_member_count: Option<u64>,
    #[serde(default)]
    member_count: Option<u64>,
}

impl From<DiscordGuild> for PlatformGuild {
    fn from(guild: DiscordGuild) -> Self {
        let icon_url = guild
            .icon
            .as_deref()
            .map(|icon| format!("{DISCORD_CDN_BASE}/icons/{}/{icon}.png?size=64", guild.id));
        Self {
            member_count: guild.approximate_member_count.or(guild.member_count),
            id: guild.id,
            name: guild.name,
            icon_url,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DiscordEmbedTitle {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DiscordMessage {
    id: String,
    channel_id: String,
    author: DiscordUser,
    #[serde(default)]
    content: String,
    #[serde(default)]
    embeds: Vec<DiscordEmbedTitle>,
}

impl From<DiscordMessage> for PlatformMessage {
    fn from(message: DiscordMessage) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            author_id: message.author.id,
            content: message.content,
            embed_titles: message
                .embeds
                .into_iter()
                .map(|embed| embed.title.unwrap_or_default())
                .collect(),
        }
    }
}

fn button_style_code(style: ButtonStyle) -> u8 {
    match style {
        ButtonStyle::Primary => 1,
        ButtonStyle::Secondary => 2,
        ButtonStyle::Success => 3,
        ButtonStyle::Danger => 4,
    }
}

fn button_payload(button: &ButtonSpec) -> Value {
    let mut payload = json!({
        "type": COMPONENT_BUTTON,
        "style": button_style_code(button.style),
        "label": button.label,
        "custom_id": button.custom_id,
    });
    if let Some(emoji) = button.emoji.as_deref() {
        payload["emoji"] = json!({ "name": emoji });
    }
    payload
}

pub(crate) fn embed_payload(embed: &OutboundEmbed) -> Value {
    let mut payload = Map::new();
    payload.insert("title".to_string(), json!(embed.title));
    if let Some(description) = embed.description.as_deref() {
        payload.insert("description".to_string(), json!(description));
    }
    if let Some(color) = embed.color {
        payload.insert("color".to_string(), json!(color));
    }
    if !embed.fields.is_empty() {
        let fields = embed
            .fields
            .iter()
            .map(|field| json!({ "name": field.name, "value": field.value, "inline": field.inline }))
            .collect::<Vec<_>>();
        payload.insert("fields".to_string(), Value::Array(fields));
    }
    if let Some(footer) = embed.footer.as_deref() {
        let mut footer_payload = json!({ "text": footer });
        if let Some(icon_url) = embed.footer_icon_url.as_deref() {
            footer_payload["icon_url"] = json!(icon_url);
        }
        payload.insert("footer".to_string(), footer_payload);
    }
    if let Some(url) = embed.thumbnail_url.as_deref() {
        payload.insert("thumbnail".to_string(), json!({ "url": url }));
    }
    if let Some(timestamp) = embed.timestamp.as_deref() {
        payload.insert("timestamp".to_string(), json!(timestamp));
    }
    Value::Object(payload)
}

pub(crate) fn message_payload(message: &OutboundMessage) -> Value {
    let rows = message
        .buttons
        .chunks(MAX_BUTTONS_PER_ROW)
        .map(|row| {
            json!({
                "type": COMPONENT_ACTION_ROW,
                "components": row.iter().map(button_payload).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();
    let mut payload = json!({
        "embeds": message.embeds.iter().map(embed_payload).collect::<Vec<_>>(),
        "components": rows,
    });
    if let Some(content) = message.content.as_deref() {
        payload["content"] = json!(content);
    }
    if let Some(reply_to) = message.reply_to.as_deref() {
        payload["message_reference"] = json!({ "message_id": reply_to, "fail_if_not_exists": false });
    }
    if message.ephemeral {
        payload["flags"] = json!(MESSAGE_FLAG_EPHEMERAL);
    }
    payload
}

pub(crate) fn modal_payload(form: &ModalForm) -> Value {
    let rows = form
        .inputs
        .iter()
        .map(|input| {
            let mut text_input = json!({
                "type": COMPONENT_TEXT_INPUT,
                "custom_id": input.custom_id,
                "label": input.label,
                "style": TEXT_INPUT_SHORT,
                "required": input.required,
            });
            if let Some(placeholder) = input.placeholder.as_deref() {
                text_input["placeholder"] = json!(placeholder);
            }
            if let Some(min_length) = input.min_length {
                text_input["min_length"] = json!(min_length);
            }
            if let Some(max_length) = input.max_length {
                text_input["max_length"] = json!(max_length);
            }
            json!({ "type": COMPONENT_ACTION_ROW, "components": [text_input] })
        })
        .collect::<Vec<_>>();
    json!({
        "custom_id": form.custom_id,
        "title": form.title,
        "components": rows,
    })
}

pub(crate) fn interaction_callback_payload(response: &InteractionResponse) -> Value {
    match response {
        InteractionResponse::Message(message) => json!({
            "type": CALLBACK_CHANNEL_MESSAGE,
            "data": message_payload(message),
        }),
        InteractionResponse::Modal(form) => json!({
            "type": CALLBACK_MODAL,
            "data": modal_payload(form),
        }),
    }
}

/// Private text channel: hidden from `@everyone` (role id equals guild id), visible to the
/// requester and the staff roles.
pub(crate) fn ticket_channel_payload(guild_id: &str, request: &TicketChannelRequest) -> Value {
    let allowed =
        (PERMISSION_VIEW_CHANNEL | PERMISSION_SEND_MESSAGES | PERMISSION_READ_MESSAGE_HISTORY)
            .to_string();
    let mut overwrites = vec![
        json!({ "id": guild_id, "type": OVERWRITE_TYPE_ROLE, "deny": PERMISSION_VIEW_CHANNEL.to_string() }),
        json!({ "id": request.owner_id, "type": OVERWRITE_TYPE_MEMBER, "allow": allowed }),
    ];
    overwrites.extend(
        request
            .staff_role_ids
            .iter()
            .map(|role_id| json!({ "id": role_id, "type": OVERWRITE_TYPE_ROLE, "allow": allowed })),
    );
    json!({
        "name": request.name,
        "type": CHANNEL_TYPE_GUILD_TEXT,
        "topic": request.topic,
        "parent_id": request.parent_id,
        "permission_overwrites": overwrites,
    })
}

#[cfg(test)]
mod tests {
    use concierge_core::{
        ButtonSpec, ButtonStyle, ContentTemplates, InteractionResponse, OutboundMessage,
        PlatformGuild, TicketChannelRequest,
    };
    use serde_json::json;

    use super::{
        interaction_callback_payload, message_payload, ticket_channel_payload, DiscordGuild,
    };

    #[test]
    fn unit_ticket_channel_payload_hides_channel_from_everyone() {
        let payload = ticket_channel_payload(
            "1000",
            &TicketChannelRequest {
                name: "ticket-alice".to_string(),
                topic: "Ticket for 42".to_string(),
                parent_id: "2000".to_string(),
                owner_id: "42".to_string(),
                staff_role_ids: vec!["3000".to_string()],
            },
        );
        assert_eq!(payload["type"], json!(0));
        assert_eq!(payload["parent_id"], json!("2000"));
        let overwrites = payload["permission_overwrites"]
            .as_array()
            .expect("overwrites");
        assert_eq!(overwrites.len(), 3);
        assert_eq!(overwrites[0], json!({ "id": "1000", "type": 0, "deny": "1024" }));
        assert_eq!(overwrites[1]["allow"], json!("68608"));
        assert_eq!(overwrites[2]["id"], json!("3000"));
    }

    #[test]
    fn unit_message_payload_groups_buttons_and_sets_ephemeral_flag() {
        let buttons = (0..6)
            .map(|index| {
                ButtonSpec::new(format!("b{index}"), "Label", ButtonStyle::Danger, Some("❌"))
            })
            .collect::<Vec<_>>();
        let payload =
            message_payload(&OutboundMessage::ephemeral_text("hello").with_buttons(buttons));
        assert_eq!(payload["content"], json!("hello"));
        assert_eq!(payload["flags"], json!(64));
        let rows = payload["components"].as_array().expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["components"].as_array().map(Vec::len), Some(5));
        assert_eq!(rows[0]["components"][0]["style"], json!(4));
        assert_eq!(rows[0]["components"][0]["emoji"]["name"], json!("❌"));
    }

    #[test]
    fn unit_modal_callback_uses_modal_type_and_text_input() {
        let form = ContentTemplates::default()
            .staff_query_modal
            .to_form("staff_query_modal", "staff_id_input");
        let payload = interaction_callback_payload(&InteractionResponse::Modal(form));
        assert_eq!(payload["type"], json!(9));
        assert_eq!(payload["data"]["custom_id"], json!("staff_query_modal"));
        let input = &payload["data"]["components"][0]["components"][0];
        assert_eq!(input["type"], json!(4));
        assert_eq!(input["custom_id"], json!("staff_id_input"));
        assert_eq!(input["max_length"], json!(20));
    }

    #[test]
    fn unit_guild_prefers_approximate_member_count_and_builds_icon_url() {
        let guild: DiscordGuild = serde_json::from_value(json!({
            "id": "1000",
            "name": "Guild",
            "icon": "abc",
            "approximate_member_count": 120
        }))
        .expect("guild");
        let guild = PlatformGuild::from(guild);
        assert_eq!(guild.member_count, Some(120));
        assert_eq!(
            guild.icon_url.as_deref(),
            Some("https://cdn.discordapp.com/icons/1000/abc.png?size=64")
        );
    }
}
