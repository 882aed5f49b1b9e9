//! Transport-neutral inbound events produced by the gateway session.

use std::collections::BTreeMap;

use concierge_core::{InteractionRef, PlatformUser};
use concierge_tickets::Caller;

/// Who triggered an interaction, where, and how to answer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionContext {
    pub interaction: InteractionRef,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub caller: Caller,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author: PlatformUser,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    ButtonActivated {
        context: InteractionContext,
        custom_id: String,
    },
    ModalSubmitted {
        context: InteractionContext,
        custom_id: String,
        fields: BTreeMap<String, String>,
    },
    PlainMessage(InboundMessage),
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ButtonActivated { .. } => "button_activated",
            Self::ModalSubmitted { .. } => "modal_submitted",
            Self::PlainMessage(_) => "plain_message",
        }
    }
}
