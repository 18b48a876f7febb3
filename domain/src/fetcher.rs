//! Concurrent fan-out/fan-in over the sources of one [`EndpointSet`].
//!
//! Every descriptor is fetched on its own task. A task yields a tagged
//! `Result`; the join loop keeps the successes and logs the failures, so a
//! broken source can only ever cost the round its own key.

use crate::error::{timeout_error, Error};
use crate::resource::{EndpointSet, PartialResult, ResourceDescriptor};
use async_trait::async_trait;
use log::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Anything that can answer a single resource query.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch(&self, descriptor: &ResourceDescriptor) -> Result<Value, Error>;
}

pub struct ParallelFetcher {
    source: Arc<dyn ResourceSource>,
    fetch_timeout: Option<Duration>,
    round_timeout: Option<Duration>,
}

impl ParallelFetcher {
    pub fn new(source: Arc<dyn ResourceSource>) -> Self {
        Self {
            source,
            fetch_timeout: None,
            round_timeout: None,
        }
    }

    /// Deadline for each individual source. A source that misses it is
    /// treated like any other failed source.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Option<Duration>) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Deadline for the whole fan-in. When it passes, unfinished tasks are
    /// aborted and the round continues with whatever already arrived.
    pub fn with_round_timeout(mut self, round_timeout: Option<Duration>) -> Self {
        self.round_timeout = round_timeout;
        self
    }

    /// Fetches every descriptor concurrently and returns the ones that succeeded.
    ///
    /// Does not return before every task has finished (or the round deadline
    /// passed). An empty result means nothing could be fetched.
    pub async fn fetch(&self, endpoints: &EndpointSet) -> PartialResult {
        let mut tasks = JoinSet::new();

        for descriptor in endpoints.iter().cloned() {
            let source = Arc::clone(&self.source);
            let fetch_timeout = self.fetch_timeout;

            tasks.spawn(async move {
                let outcome = match fetch_timeout {
                    Some(limit) => tokio::time::timeout(limit, source.fetch(&descriptor))
                        .await
                        .unwrap_or_else(|_| Err(timeout_error(descriptor.path(), limit))),
                    None => source.fetch(&descriptor).await,
                };
                (descriptor, outcome)
            });
        }

        let deadline = self.round_timeout.map(|limit| Instant::now() + limit);
        let mut results = PartialResult::new();

        loop {
            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await
                {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(
                            "Round deadline passed with {} fetches outstanding, aborting them",
                            tasks.len()
                        );
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((descriptor, Ok(value))) => {
                    results.insert(descriptor.key().to_string(), value);
                }
                Ok((descriptor, Err(err))) => {
                    warn!("Error fetching {}: {err}", descriptor.path());
                }
                Err(err) => {
                    error!("Fetch task ended abnormally: {err}");
                }
            }
        }

        debug!(
            "Fetched {} of {} endpoints",
            results.len(),
            endpoints.len()
        );
        results
    }
}
