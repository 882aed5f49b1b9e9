//! Foundational types shared across Concierge crates.
//!
//! Provides the abstract messaging-platform contract, externally supplied content
//! templates, identifier parsing and time helpers used by the ticket lifecycle,
//! analytics, dashboard and transport layers.

pub mod content_templates;
pub mod controls;
pub mod identifiers;
pub mod platform;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod time_utils;

pub use content_templates::{
    fill_placeholders, ButtonLabels, ContentTemplates, EmbedFieldTemplate, EmbedTemplate,
    ModalTemplate, ResponseTemplates,
};
pub use identifiers::{first_mention, is_platform_identifier, mention_of, mentions_user};
pub use platform::{
    ButtonSpec, ButtonStyle, ChannelKind, EmbedField, HistoryQuery, InteractionRef,
    InteractionResponse, ModalForm, ModalInput, OutboundEmbed, OutboundMessage, PlatformApi,
    PlatformChannel, PlatformError, PlatformGuild, PlatformMessage, PlatformResult, PlatformUser,
    TicketChannelRequest,
};
pub use time_utils::{
    current_rfc3339_timestamp, current_unix_timestamp, current_unix_timestamp_ms,
    relative_timestamp_markup, timestamp_markup,
};
