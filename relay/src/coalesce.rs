//! Single-flight coalescing of refresh rounds per event.
//!
//! While a round for an event is running, further triggers for the same event
//! do not start rounds of their own. They mark the running round as stale
//! instead, and its owner runs exactly one more round when it finishes, so the
//! last trigger is always followed by a fetch that started after it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use events::EventId;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct SingleFlight {
    // Value is `true` when another trigger arrived during the running round.
    in_flight: Arc<DashMap<EventId, bool>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the flight for `event_id`. Returns `None` when a round is already
    /// running; that round is then marked to run again.
    pub fn begin(&self, event_id: &EventId) -> Option<Flight> {
        match self.in_flight.entry(event_id.clone()) {
            Entry::Occupied(mut running) => {
                *running.get_mut() = true;
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(false);
                Some(Flight {
                    in_flight: Arc::clone(&self.in_flight),
                    event_id: event_id.clone(),
                    landed: false,
                })
            }
        }
    }

    #[cfg(test)]
    fn is_in_flight(&self, event_id: &EventId) -> bool {
        self.in_flight.contains_key(event_id)
    }
}

/// Ownership of the running round for one event. Dropping it releases the
/// event even if the round never called [`Flight::land`].
pub struct Flight {
    in_flight: Arc<DashMap<EventId, bool>>,
    event_id: EventId,
    landed: bool,
}

impl Flight {
    /// Called after each round. Returns `true` if triggers arrived meanwhile and
    /// another round must run; otherwise releases the event and returns `false`.
    pub fn land(&mut self) -> bool {
        if self
            .in_flight
            .remove_if(&self.event_id, |_, rerun| !*rerun)
            .is_some()
        {
            self.landed = true;
            return false;
        }

        match self.in_flight.get_mut(&self.event_id) {
            Some(mut rerun) => {
                *rerun = false;
                true
            }
            None => {
                self.landed = true;
                false
            }
        }
    }
}

impl Drop for Flight {
    fn drop(&mut self) {
        if !self.landed {
            self.in_flight.remove(&self.event_id);
        }
    }
}
