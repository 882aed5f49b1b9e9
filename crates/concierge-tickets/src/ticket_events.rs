//! Broadcast of ticket state transitions to independent subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::PlatformUser;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::ticket_registry::Ticket;

const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketEvent {
    Created { ticket: Ticket, owner: PlatformUser },
    Claimed { ticket: Ticket, staff: PlatformUser },
    Closed { ticket: Ticket, closed_by: PlatformUser },
}

impl TicketEvent {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Self::Created { ticket, .. }
            | Self::Claimed { ticket, .. }
            | Self::Closed { ticket, .. } => ticket,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Claimed { .. } => "claimed",
            Self::Closed { .. } => "closed",
        }
    }

    /// True for transitions that change the number of live tickets.
    pub fn changes_active_count(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::Closed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TicketEventBus {
    sender: broadcast::Sender<TicketEvent>,
}

impl Default for TicketEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl TicketEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: TicketEvent) {
        let kind = event.kind();
        let channel_id = event.ticket().channel_id.clone();
        if self.sender.send(event).is_err() {
            debug!(kind, channel_id = %channel_id, "ticket event had no subscribers");
        }
    }
}

/// Reacts to ticket events. Failures are logged by the subscriber loop and never reach the
/// operation that emitted the event.
#[async_trait]
pub trait TicketEventSink: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &TicketEvent) -> anyhow::Result<()>;
}

/// Runs `sink` for every event published on `bus` until the bus is dropped.
pub fn spawn_event_subscriber(bus: &TicketEventBus, sink: Arc<dyn TicketEventSink>) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(error) = sink.handle(&event).await {
                        warn!(
                            sink = sink.name(),
                            kind = event.kind(),
                            channel_id = %event.ticket().channel_id,
                            error = %format!("{error:#}"),
                            "ticket event handler failed"
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(sink = sink.name(), skipped, "ticket event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
