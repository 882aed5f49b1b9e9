//! Discord adapter for Concierge.
//!
//! Implements the platform contract over the Discord REST API, runs the gateway session that
//! feeds inbound interactions and messages, and routes them to the ticket lifecycle, the staff
//! query flow and the entry panel.

pub mod concierge_config;
mod discord_helpers;
pub mod discord_runtime;
pub mod event_router;
pub mod inbound_events;
pub mod panel_publisher;
pub mod staff_query;
pub mod ticket_commands;

pub use concierge_config::ConciergeConfig;
pub use discord_runtime::{
    run_discord_runtime, ConciergeServices, DiscordApiClient, DiscordRuntimeConfig,
    DEFAULT_DISCORD_API_BASE, DEFAULT_DISCORD_GATEWAY_URL,
};
pub use event_router::EventRouter;
pub use inbound_events::{InboundEvent, InboundMessage, InteractionContext};
pub use panel_publisher::PanelPublisher;
pub use staff_query::{StaffQueryFlow, StaffQueryResult};
pub use ticket_commands::{parse_ticket_command, TicketCommand};
