//! Ticket lifecycle: creation, claiming, closing, and the events those transitions emit.

pub mod ticket_errors;
pub mod ticket_events;
pub mod ticket_lifecycle;
pub mod ticket_notifier;
pub mod ticket_registry;

pub use ticket_errors::{TicketAction, TicketError};
pub use ticket_events::{spawn_event_subscriber, TicketEvent, TicketEventBus, TicketEventSink};
pub use ticket_lifecycle::{
    ticket_channel_name, ticket_channel_topic, Caller, ClosedTicket, TicketHandle,
    TicketLifecycleConfig, TicketLifecycleManager,
};
pub use ticket_notifier::TicketLogNotifier;
pub use ticket_registry::{Ticket, TicketState};
