//! Error taxonomy shared by every ticket operation and the staff query flow.

use std::fmt;

use concierge_core::{fill_placeholders, mention_of, ContentTemplates, PlatformError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAction {
    Claim,
    Close,
}

impl fmt::Display for TicketAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claim => f.write_str("claim"),
            Self::Close => f.write_str("close"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("requester already holds the maximum of {max} live ticket(s)")]
    LimitExceeded { max: usize },
    #[error("requester already has ticket channel '{channel_id}'")]
    DuplicateTicket { channel_id: String },
    #[error("required configuration is missing: {item}")]
    ConfigurationMissing { item: String },
    #[error("channel '{channel_id}' is not a live ticket")]
    NotATicket { channel_id: String },
    #[error("caller is not allowed to {action} this ticket")]
    Forbidden { action: TicketAction },
    #[error("ticket is already claimed by '{staff_id}'")]
    AlreadyClaimed { staff_id: String },
    #[error("'{value}' is not a valid platform identifier")]
    InvalidIdentifierFormat { value: String },
    #[error("external resource unavailable: {0}")]
    ExternalUnavailable(String),
    #[error("transport failure: {0}")]
    TransportFailure(String),
}

impl From<PlatformError> for TicketError {
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::NotFound { .. } => Self::ExternalUnavailable(error.to_string()),
            PlatformError::Transport { .. } => Self::TransportFailure(error.to_string()),
        }
    }
}

impl TicketError {
    /// Localized text shown to the user who triggered the failing operation.
    pub fn response_text(&self, templates: &ContentTemplates) -> String {
        let responses = &templates.responses;
        match self {
            Self::LimitExceeded { max } => {
                let max = max.to_string();
                fill_placeholders(&responses.max_tickets_reached, &[("max", max.as_str())])
            }
            Self::DuplicateTicket { channel_id } => {
                let channel = format!("<#{channel_id}>");
                fill_placeholders(&responses.ticket_exists, &[("channel", channel.as_str())])
            }
            Self::ConfigurationMissing { item } => {
                fill_placeholders(&responses.configuration_missing, &[("item", item.as_str())])
            }
            Self::NotATicket { .. } => responses.not_ticket_channel.clone(),
            Self::Forbidden {
                action: TicketAction::Claim,
            } => responses.no_claim_permission.clone(),
            Self::Forbidden {
                action: TicketAction::Close,
            } => responses.no_close_permission.clone(),
            Self::AlreadyClaimed { staff_id } => {
                let staff = mention_of(staff_id);
                fill_placeholders(&responses.ticket_already_claimed, &[("staff", staff.as_str())])
            }
            Self::InvalidIdentifierFormat { .. } => responses.invalid_identifier.clone(),
            Self::ExternalUnavailable(_) => responses.external_unavailable.clone(),
            Self::TransportFailure(_) => responses.transport_failure.clone(),
        }
    }
}
