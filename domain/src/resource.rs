use crate::error::{config_error, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Data gathered in one round, keyed by result key. A key is present only if its
/// source answered with well-formed data; absence is the only failure signal.
pub type PartialResult = BTreeMap<String, Value>;

/// Known upstream paths and the short keys subscribers expect them under.
const RESULT_KEYS: &[(&str, &str)] = &[
    ("/repair-orders/stats/overview", "orders_overview"),
    ("/repair-orders/stats/revenue", "orders_revenue"),
    ("/repair-orders/stats/by-status", "orders_by_status"),
    ("/repair-orders/stats/recent", "orders_recent"),
    ("/repair-orders/stats/top-services", "orders_top_services"),
    ("/repair-orders/stats/count/total", "orders_count_total"),
    ("/repair-orders/stats/count/active", "orders_count_active"),
    ("/repair-orders/stats/revenue/total", "orders_revenue_total"),
    ("/users/stats/overview", "users_overview"),
    ("/users/stats/top-clients", "users_top_clients"),
    ("/users/stats/top-technicians", "users_top_technicians"),
    ("/users/stats/count/clients", "users_count_clients"),
    ("/users/stats/count/technicians", "users_count_technicians"),
    (
        "/users/stats/count/active-technicians",
        "users_count_active_technicians",
    ),
];

/// One upstream data source: a path relative to the upstream base URL and the
/// key its data is published under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    path: String,
    key: String,
}

impl ResourceDescriptor {
    pub fn new(path: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Descriptor for `path` using its well-known result key, or the path itself
    /// when the path is not one of the known dashboard sources.
    pub fn from_path(path: &str) -> Self {
        Self::new(path, result_key(path))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

fn result_key(path: &str) -> &str {
    RESULT_KEYS
        .iter()
        .find(|(known, _)| *known == path)
        .map(|(_, key)| *key)
        .unwrap_or(path)
}

/// Ordered, non-empty list of sources refreshed for one event.
/// Cheap to clone; the descriptors are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSet(Arc<[ResourceDescriptor]>);

impl EndpointSet {
    /// Builds a set, keeping the first descriptor for any repeated result key.
    /// Every path must start with `/`.
    pub fn new(descriptors: Vec<ResourceDescriptor>) -> Result<Self, Error> {
        if let Some(relative) = descriptors.iter().find(|d| !d.path.starts_with('/')) {
            return Err(config_error(&format!(
                "Resource path {:?} must start with '/'",
                relative.path
            )));
        }

        let mut seen = HashSet::new();
        let unique: Vec<ResourceDescriptor> = descriptors
            .into_iter()
            .filter(|descriptor| seen.insert(descriptor.key.clone()))
            .collect();

        if unique.is_empty() {
            return Err(config_error("An endpoint set must name at least one resource"));
        }

        Ok(Self(unique.into()))
    }

    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Result<Self, Error> {
        Self::new(
            paths
                .iter()
                .map(|path| ResourceDescriptor::from_path(path.as_ref()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(ResourceDescriptor::key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_uses_known_result_key() {
        let descriptor = ResourceDescriptor::from_path("/users/stats/count/clients");
        assert_eq!(descriptor.key(), "users_count_clients");
        assert_eq!(descriptor.path(), "/users/stats/count/clients");
    }

    #[test]
    fn from_path_falls_back_to_path_for_unknown_sources() {
        let descriptor = ResourceDescriptor::from_path("/reviews/stats/overview");
        assert_eq!(descriptor.key(), "/reviews/stats/overview");
    }

    #[test]
    fn endpoint_set_rejects_empty_input() {
        assert!(EndpointSet::new(Vec::new()).is_err());
        assert!(EndpointSet::from_paths::<&str>(&[]).is_err());
    }

    #[test]
    fn endpoint_set_rejects_relative_paths() {
        let err = EndpointSet::from_paths(&["/users/stats/overview", "users"]).unwrap_err();
        assert_eq!(
            err.error_kind,
            crate::error::DomainErrorKind::Internal(crate::error::InternalErrorKind::Config)
        );

        let explicit = vec![ResourceDescriptor::new("reviews/stats", "reviews")];
        assert!(EndpointSet::new(explicit).is_err());
    }

    #[test]
    fn endpoint_set_keeps_order_and_drops_repeated_keys() {
        let set = EndpointSet::from_paths(&[
            "/users/stats/overview",
            "/users/stats/count/clients",
            "/users/stats/overview",
        ])
        .unwrap();

        assert_eq!(
            set.keys().collect::<Vec<_>>(),
            vec!["users_overview", "users_count_clients"]
        );
    }
}
