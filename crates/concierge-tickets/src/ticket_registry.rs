//! Volatile registry of live tickets keyed by channel id.
//!
//! Every read-check-write sequence runs under one lock acquisition so concurrent claims and
//! closes observe a single winner. The lock is never held across an await point. Creation
//! reserves a per-owner slot up front so the configured limit holds while the channel is
//! still being created on the platform.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use crate::ticket_errors::{TicketAction, TicketError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    Open,
    Claimed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub channel_id: String,
    pub channel_name: String,
    pub owner_id: String,
    pub owner_tag: String,
    pub created_unix_ms: u64,
    pub claimed_by: Option<String>,
}

impl Ticket {
    pub fn state(&self) -> TicketState {
        if self.claimed_by.is_some() {
            TicketState::Claimed
        } else {
            TicketState::Open
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    tickets: HashMap<String, Ticket>,
    pending_by_owner: HashMap<String, usize>,
}

impl RegistryState {
    fn live_count_for(&self, owner_id: &str) -> usize {
        self.tickets
            .values()
            .filter(|ticket| ticket.owner_id == owner_id)
            .count()
    }

    fn release_pending(&mut self, owner_id: &str) {
        if let Some(pending) = self.pending_by_owner.get_mut(owner_id) {
            *pending = pending.saturating_sub(1);
            if *pending == 0 {
                self.pending_by_owner.remove(owner_id);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TicketRegistry {
    state: Mutex<RegistryState>,
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.state().tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, channel_id: &str) -> Option<Ticket> {
        self.state().tickets.get(channel_id).cloned()
    }

    pub fn live_count_for(&self, owner_id: &str) -> usize {
        self.state().live_count_for(owner_id)
    }

    /// Reserves one creation slot for `owner_id` unless live plus in-flight tickets already
    /// reach `max`.
    pub(crate) fn reserve_slot(
        &self,
        owner_id: &str,
        max: usize,
    ) -> Result<SlotReservation<'_>, TicketError> {
        let mut state = self.state();
        let pending = state
            .pending_by_owner
            .get(owner_id)
            .copied()
            .unwrap_or_default();
        if state.live_count_for(owner_id) + pending >= max {
            return Err(TicketError::LimitExceeded { max });
        }
        *state
            .pending_by_owner
            .entry(owner_id.to_string())
            .or_default() += 1;
        Ok(SlotReservation {
            registry: self,
            owner_id: owner_id.to_string(),
            settled: false,
        })
    }

    /// Open -> Claimed. Fails when the channel is not tracked, the caller lacks authority,
    /// or someone already claimed it.
    pub(crate) fn claim(
        &self,
        channel_id: &str,
        staff_id: &str,
        authorized: bool,
    ) -> Result<Ticket, TicketError> {
        let mut state = self.state();
        let ticket = state
            .tickets
            .get_mut(channel_id)
            .ok_or_else(|| TicketError::NotATicket {
                channel_id: channel_id.to_string(),
            })?;
        if !authorized {
            return Err(TicketError::Forbidden {
                action: TicketAction::Claim,
            });
        }
        if let Some(existing) = &ticket.claimed_by {
            return Err(TicketError::AlreadyClaimed {
                staff_id: existing.clone(),
            });
        }
        ticket.claimed_by = Some(staff_id.to_string());
        Ok(ticket.clone())
    }

    /// Removes the ticket when `allowed` accepts it. The entry is gone before this returns,
    /// so every later operation on the channel sees `NotATicket`.
    pub(crate) fn remove_if<F>(&self, channel_id: &str, allowed: F) -> Result<Ticket, TicketError>
    where
        F: FnOnce(&Ticket) -> bool,
    {
        let mut state = self.state();
        let ticket = state
            .tickets
            .get(channel_id)
            .ok_or_else(|| TicketError::NotATicket {
                channel_id: channel_id.to_string(),
            })?;
        if !allowed(ticket) {
            return Err(TicketError::Forbidden {
                action: TicketAction::Close,
            });
        }
        state
            .tickets
            .remove(channel_id)
            .ok_or_else(|| TicketError::NotATicket {
                channel_id: channel_id.to_string(),
            })
    }
}

/// In-flight creation slot. Dropping it without [`SlotReservation::commit`] frees the slot.
pub(crate) struct SlotReservation<'a> {
    registry: &'a TicketRegistry,
    owner_id: String,
    settled: bool,
}

impl SlotReservation<'_> {
    pub(crate) fn commit(mut self, ticket: Ticket) {
        let mut state = self.registry.state();
        state.release_pending(&self.owner_id);
        state.tickets.insert(ticket.channel_id.clone(), ticket);
        self.settled = true;
    }
}

impl Drop for SlotReservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.state().release_pending(&self.owner_id);
        }
    }
}
