use crate::coalesce::SingleFlight;
use crate::manager::{BroadcastReport, Manager};
use crate::message::OutgoingMessage;
use async_trait::async_trait;
use domain::{EventRouter, ParallelFetcher};
use events::{DomainEvent, EventHandler, EventId};
use log::*;
use std::sync::Arc;

/// How a round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Data was fetched and handed to the subscribers.
    Broadcast(BroadcastReport),
    /// Every source failed; nothing was sent.
    NoData,
    /// Another round for the same event was already running and will cover
    /// this trigger.
    Coalesced,
}

/// Handles domain events by running a refresh round:
/// 1. Resolve the event to the endpoints it invalidates
/// 2. Fetch those endpoints concurrently
/// 3. Broadcast the data that arrived to every live subscriber
pub struct RelayEventHandler {
    router: Arc<EventRouter>,
    fetcher: ParallelFetcher,
    manager: Arc<Manager>,
    single_flight: Option<SingleFlight>,
}

impl RelayEventHandler {
    pub fn new(router: Arc<EventRouter>, fetcher: ParallelFetcher, manager: Arc<Manager>) -> Self {
        Self {
            router,
            fetcher,
            manager,
            single_flight: None,
        }
    }

    /// Collapse overlapping triggers for the same event into one running round.
    pub fn with_single_flight(mut self) -> Self {
        self.single_flight = Some(SingleFlight::new());
        self
    }

    /// Runs the round(s) for one trigger and reports the outcome of the last one.
    pub async fn process(&self, event_id: &EventId) -> RoundOutcome {
        let Some(flights) = &self.single_flight else {
            return self.run_round(event_id).await;
        };

        let Some(mut flight) = flights.begin(event_id) else {
            debug!("Round for {event_id} already in flight, coalescing trigger");
            return RoundOutcome::Coalesced;
        };

        let mut outcome = self.run_round(event_id).await;
        while flight.land() {
            debug!("Triggers for {event_id} arrived during the round, refreshing again");
            outcome = self.run_round(event_id).await;
        }
        outcome
    }

    async fn run_round(&self, event_id: &EventId) -> RoundOutcome {
        let endpoints = self.router.resolve(event_id);
        info!("Event: {event_id} -> Fetching {} endpoints", endpoints.len());

        let data = self.fetcher.fetch(endpoints).await;
        if data.is_empty() {
            info!("No data fetched for {event_id}, skipping broadcast");
            return RoundOutcome::NoData;
        }

        let metrics = data.len();
        let message = OutgoingMessage::new(event_id.clone(), data);
        let report = self.manager.broadcast(&message).await;

        info!(
            "Broadcasted {metrics} metrics for {event_id} to {} subscribers ({} evicted)",
            report.delivered,
            report.evicted.len()
        );
        RoundOutcome::Broadcast(report)
    }
}

#[async_trait]
impl EventHandler for RelayEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::DashboardUpdate {
                event_id,
                resource_id,
            } => {
                debug!(
                    "Handling DashboardUpdate {event_id} (resource {})",
                    resource_id.as_deref().unwrap_or("-")
                );

                let outcome = self.process(event_id).await;
                debug!("Round for {event_id} finished: {outcome:?}");
            }
        }
    }
}
