//! Maps an event to the data sources it invalidates.

use crate::error::{config_error, config_source_error, Error};
use crate::resource::{EndpointSet, ResourceDescriptor};
use events::{EventId, FULL_UPDATE};
use log::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const REPAIR_ORDER_CREATED: &[&str] = &[
    "/repair-orders/stats/overview",
    "/repair-orders/stats/by-status",
    "/repair-orders/stats/recent",
    "/repair-orders/stats/count/total",
    "/repair-orders/stats/count/active",
];

const USER_CREATED: &[&str] = &["/users/stats/overview", "/users/stats/count/clients"];

const TECHNICIAN_CREATED: &[&str] = &[
    "/users/stats/overview",
    "/users/stats/count/technicians",
    "/users/stats/count/active-technicians",
];

const DASHBOARD_FULL_UPDATE: &[&str] = &[
    "/repair-orders/stats/overview",
    "/repair-orders/stats/revenue",
    "/repair-orders/stats/by-status",
    "/repair-orders/stats/recent",
    "/repair-orders/stats/top-services",
    "/users/stats/overview",
    "/users/stats/top-clients",
    "/users/stats/top-technicians",
];

/// A routing table entry as written in a routes file: either a bare path or a
/// path with an explicit result key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RouteEntry {
    Path(String),
    Descriptor(ResourceDescriptor),
}

impl From<RouteEntry> for ResourceDescriptor {
    fn from(entry: RouteEntry) -> Self {
        match entry {
            RouteEntry::Path(path) => ResourceDescriptor::from_path(&path),
            RouteEntry::Descriptor(descriptor) => descriptor,
        }
    }
}

/// Static event → endpoint table. Unknown events resolve to the full-update set,
/// which is guaranteed to exist and be non-empty.
#[derive(Debug, Clone)]
pub struct EventRouter {
    table: HashMap<EventId, EndpointSet>,
    full_update: EndpointSet,
}

impl EventRouter {
    /// Builds a router from an arbitrary table. The table must contain
    /// [`FULL_UPDATE`], since every unknown event falls back to it.
    pub fn new(table: HashMap<EventId, EndpointSet>) -> Result<Self, Error> {
        let full_update = table
            .get(&EventId::full_update())
            .cloned()
            .ok_or_else(|| {
                config_error(&format!("Routing table has no {FULL_UPDATE} entry"))
            })?;

        Ok(Self { table, full_update })
    }

    /// The built-in dashboard routing table.
    pub fn dashboard() -> Result<Self, Error> {
        let table = [
            ("REPAIR_ORDER_CREATED", REPAIR_ORDER_CREATED),
            ("USER_CREATED", USER_CREATED),
            ("TECHNICIAN_CREATED", TECHNICIAN_CREATED),
            (FULL_UPDATE, DASHBOARD_FULL_UPDATE),
        ]
        .into_iter()
        .map(|(event, paths)| {
            EndpointSet::from_paths(paths).map(|endpoints| (EventId::new(event), endpoints))
        })
        .collect::<Result<HashMap<_, _>, Error>>()?;

        Self::new(table)
    }

    /// Parses a routing table of the form
    /// `{"EVENT": ["/path", {"path": "/other", "key": "other_key"}]}`.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: HashMap<String, Vec<RouteEntry>> =
            serde_json::from_str(json).map_err(config_source_error)?;

        let mut table = HashMap::with_capacity(raw.len());
        for (event, entries) in raw {
            let descriptors = entries.into_iter().map(ResourceDescriptor::from).collect();
            let endpoints = EndpointSet::new(descriptors).map_err(|err| {
                warn!("Routing entry {event} has no endpoints");
                err
            })?;
            table.insert(EventId::new(event), endpoints);
        }

        Self::new(table)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        info!("Loading routing table from {}", path.display());
        let json = std::fs::read_to_string(path).map_err(config_source_error)?;
        Self::from_json(&json)
    }

    /// Returns the endpoints `event_id` invalidates. Never fails: an unknown
    /// event gets the full-update set.
    pub fn resolve(&self, event_id: &EventId) -> &EndpointSet {
        match self.table.get(event_id) {
            Some(endpoints) => endpoints,
            None => {
                info!("Unknown event type: {event_id}, fetching full dashboard");
                &self.full_update
            }
        }
    }

    #[cfg(test)]
    fn contains(&self, event_id: &EventId) -> bool {
        self.table.contains_key(event_id)
    }

    /// Number of configured event identifiers, the full-update one included.
    pub fn event_count(&self) -> usize {
        self.table.len()
    }
}
