//! Discord gateway frames: parsing, identify/heartbeat payloads and dispatch normalisation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use concierge_core::{InteractionRef, PlatformUser};
use concierge_tickets::Caller;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::discord_payloads::{DiscordUser, PERMISSION_ADMINISTRATOR};
use crate::inbound_events::{InboundEvent, InboundMessage, InteractionContext};

pub(crate) const OP_DISPATCH: u8 = 0;
pub(crate) const OP_HEARTBEAT: u8 = 1;
pub(crate) const OP_IDENTIFY: u8 = 2;
pub(crate) const OP_RECONNECT: u8 = 7;
pub(crate) const OP_INVALID_SESSION: u8 = 9;
pub(crate) const OP_HELLO: u8 = 10;
pub(crate) const OP_HEARTBEAT_ACK: u8 = 11;

const INTENT_GUILDS: u64 = 1 << 0;
const INTENT_GUILD_MEMBERS: u64 = 1 << 1;
const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;
pub(crate) const GATEWAY_INTENTS: u64 =
    INTENT_GUILDS | INTENT_GUILD_MEMBERS | INTENT_GUILD_MESSAGES | INTENT_MESSAGE_CONTENT;

const INTERACTION_MESSAGE_COMPONENT: u8 = 3;
const INTERACTION_MODAL_SUBMIT: u8 = 5;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GatewayFrame {
    pub(crate) op: u8,
    #[serde(default)]
    pub(crate) d: Value,
    #[serde(default)]
    pub(crate) s: Option<u64>,
    #[serde(default)]
    pub(crate) t: Option<String>,
}

impl GatewayFrame {
    pub(crate) fn heartbeat_interval_ms(&self) -> Option<u64> {
        (self.op == OP_HELLO)
            .then(|| self.d.get("heartbeat_interval").and_then(Value::as_u64))
            .flatten()
    }
}

pub(crate) fn parse_gateway_frame(message: WsMessage) -> Result<Option<GatewayFrame>> {
    match message {
        WsMessage::Text(text) => {
            let frame = serde_json::from_str::<GatewayFrame>(&text)
                .context("failed to parse discord gateway frame")?;
            Ok(Some(frame))
        }
        WsMessage::Binary(bytes) => {
            let text = String::from_utf8(bytes.to_vec())
                .context("invalid utf-8 discord gateway payload")?;
            let frame = serde_json::from_str::<GatewayFrame>(&text)
                .context("failed to parse discord gateway frame")?;
            Ok(Some(frame))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}

pub(crate) fn identify_payload(bot_token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": bot_token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "concierge",
                "device": "concierge",
            },
        },
    })
}

pub(crate) fn heartbeat_payload(sequence: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": sequence })
}

#[derive(Debug, Deserialize)]
struct GuildMemberPayload {
    #[serde(default)]
    user: Option<DiscordUser>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    permissions: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentPayload {
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    components: Vec<ComponentPayload>,
}

#[derive(Debug, Deserialize)]
struct InteractionData {
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    components: Vec<ComponentPayload>,
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    id: String,
    token: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    member: Option<GuildMemberPayload>,
    #[serde(default)]
    user: Option<DiscordUser>,
    #[serde(default)]
    data: Option<InteractionData>,
}

#[derive(Debug, Deserialize)]
struct MessageCreatePayload {
    id: String,
    channel_id: String,
    #[serde(default)]
    guild_id: Option<String>,
    author: DiscordUser,
    #[serde(default)]
    content: String,
}

/// Turns a dispatch frame into an inbound event. Unhandled dispatch types yield `None`.
pub(crate) fn normalize_dispatch(frame: &GatewayFrame) -> Result<Option<InboundEvent>> {
    match frame.t.as_deref() {
        Some("INTERACTION_CREATE") => {
            let payload = serde_json::from_value::<InteractionPayload>(frame.d.clone())
                .context("failed to decode discord interaction")?;
            Ok(normalize_interaction(payload))
        }
        Some("MESSAGE_CREATE") => {
            let payload = serde_json::from_value::<MessageCreatePayload>(frame.d.clone())
                .context("failed to decode discord message")?;
            Ok(Some(InboundEvent::PlainMessage(InboundMessage {
                id: payload.id,
                channel_id: payload.channel_id,
                guild_id: payload.guild_id,
                author: payload.author.into(),
                content: payload.content,
            })))
        }
        _ => Ok(None),
    }
}

fn normalize_interaction(payload: InteractionPayload) -> Option<InboundEvent> {
    let InteractionPayload {
        id,
        token,
        kind,
        guild_id,
        channel_id,
        member,
        user,
        data,
    } = payload;
    let data = data?;
    let custom_id = data.custom_id.clone()?;
    let caller = interaction_caller(member, user)?;
    let context = InteractionContext {
        interaction: InteractionRef { id, token },
        guild_id,
        channel_id: channel_id.unwrap_or_default(),
        caller,
    };
    match kind {
        INTERACTION_MESSAGE_COMPONENT => Some(InboundEvent::ButtonActivated { context, custom_id }),
        INTERACTION_MODAL_SUBMIT => {
            let mut fields = BTreeMap::new();
            collect_modal_fields(&data.components, &mut fields);
            Some(InboundEvent::ModalSubmitted {
                context,
                custom_id,
                fields,
            })
        }
        _ => None,
    }
}

fn interaction_caller(
    member: Option<GuildMemberPayload>,
    user: Option<DiscordUser>,
) -> Option<Caller> {
    match member {
        Some(member) => {
            let permissions = member
                .permissions
                .as_deref()
                .and_then(|raw| raw.parse::<u64>().ok())
                .unwrap_or_default();
            let user = member.user.or(user)?;
            Some(Caller {
                user: PlatformUser::from(user),
                role_ids: member.roles,
                is_admin: permissions & PERMISSION_ADMINISTRATOR != 0,
            })
        }
        None => user.map(|user| Caller {
            user: PlatformUser::from(user),
            role_ids: Vec::new(),
            is_admin: false,
        }),
    }
}

fn collect_modal_fields(components: &[ComponentPayload], fields: &mut BTreeMap<String, String>) {
    for component in components {
        if let (Some(custom_id), Some(value)) = (&component.custom_id, &component.value) {
            fields.insert(custom_id.clone(), value.clone());
        }
        collect_modal_fields(&component.components, fields);
    }
}
