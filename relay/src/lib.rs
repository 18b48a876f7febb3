//! Push side of the dashboard relay.
//!
//! This crate turns a domain event into a refresh round and fans the result
//! out to every connected WebSocket subscriber.
//!
//! # Architecture
//!
//! - **Broadcast only**: Every subscriber receives every round. There are no
//!   topics and no per-client filtering.
//! - **Ephemeral messages**: A subscriber that connects after a round missed it
//!   and waits for the next one. Nothing is replayed on connect.
//! - **Registry as liveness**: A subscriber is alive exactly as long as it is
//!   registered. Failed delivery evicts it; it has to reconnect.
//! - **Bounded queues**: Each subscriber owns a bounded outbound queue drained
//!   by its connection task. A full queue counts as a failed delivery.
//!
//! # Round Flow
//!
//! 1. `RelayEventHandler` receives a `DomainEvent::DashboardUpdate`
//! 2. `EventRouter` resolves the event to an `EndpointSet`
//! 3. `ParallelFetcher` fetches every endpoint concurrently into a `PartialResult`
//! 4. An empty result ends the round with nothing sent
//! 5. Otherwise `Manager` serializes one `OutgoingMessage` and queues it for
//!    every live subscriber, evicting the ones that fail
//!
//! # Modules
//!
//! - `coalesce`: Optional single-flight collapsing of overlapping rounds per event
//! - `connection`: SubscriberRegistry and the per-subscriber sink
//! - `domain_event_handler`: The round pipeline as an `EventHandler`
//! - `manager`: Broadcast fan-out with eviction (delegates to SubscriberRegistry)
//! - `message`: The wire frame pushed to subscribers

pub mod coalesce;
pub mod connection;
pub mod domain_event_handler;
pub mod manager;
pub mod message;

pub use manager::Manager;
