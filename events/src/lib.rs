//! Event system infrastructure for the dashboard relay.
//!
//! This crate provides the event vocabulary that decouples the HTTP ingress
//! from the refresh pipeline that answers it.
//!
//! # Architecture
//!
//! - **EventId**: Opaque name of a domain occurrence (e.g. `USER_CREATED`)
//! - **DomainEvent**: Enum representing every notification the relay reacts to
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates, so both the web layer and
//! the relay layer can depend on it without cycles.

use async_trait::async_trait;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Identifier that asks for a refresh of every dashboard data source.
pub const FULL_UPDATE: &str = "DASHBOARD_FULL_UPDATE";

/// Envelope field carrying the event identifier.
const TYPE_FIELD: &str = "type";
/// Envelope field carrying the (informational) id of the changed resource.
const RESOURCE_ID_FIELD: &str = "resourceId";

/// Name of a domain occurrence. The vocabulary is open: any string is a valid id,
/// routing decides what it refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn full_update() -> Self {
        Self(FULL_UPDATE.to_string())
    }

    #[cfg(test)]
    fn is_full_update(&self) -> bool {
        self.0 == FULL_UPDATE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Domain events that the relay turns into refresh rounds.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// Emitted when the backend reports that dashboard data changed.
    DashboardUpdate {
        /// Which occurrence happened; decides the set of sources to refresh.
        event_id: EventId,
        /// Id of the changed resource. Informational only, never routed on.
        resource_id: Option<String>,
    },
}

impl DomainEvent {
    /// Builds an event from a notification envelope.
    ///
    /// A missing or non-string `type` falls back to [`FULL_UPDATE`] so that a
    /// malformed trigger still refreshes subscribers instead of being dropped.
    pub fn from_notification(payload: &Map<String, Value>) -> Self {
        let event_id = match payload.get(TYPE_FIELD).and_then(Value::as_str) {
            Some(id) => EventId::new(id),
            None => {
                debug!("Notification without a string `{TYPE_FIELD}`, using {FULL_UPDATE}");
                EventId::full_update()
            }
        };

        let resource_id = payload
            .get(RESOURCE_ID_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string);

        DomainEvent::DashboardUpdate {
            event_id,
            resource_id,
        }
    }

    pub fn event_id(&self) -> &EventId {
        match self {
            DomainEvent::DashboardUpdate { event_id, .. } => event_id,
        }
    }
}

/// Trait for handling domain events.
/// Implementations perform side effects like fetching and pushing data.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers and wait for them to finish.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Publish on a new task and return immediately.
    ///
    /// The handle resolves once every handler has returned. Callers that only
    /// acknowledge the trigger may drop it; the task keeps running detached.
    pub fn spawn_publish(&self, event: DomainEvent) -> JoinHandle<()> {
        let publisher = self.clone();
        tokio::spawn(async move { publisher.publish(event).await })
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
