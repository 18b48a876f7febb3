use config::Config;
use domain::gateway::upstream::HttpSource;
use domain::{Error, EventRouter, ParallelFetcher};
use events::EventPublisher;
use log::info;
use relay::domain_event_handler::RelayEventHandler;
use relay::Manager;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub relay_manager: Arc<Manager>,
    pub event_publisher: EventPublisher,
    pub event_router: Arc<EventRouter>,
}

/// Wires the refresh pipeline: routing table, upstream source, fetcher,
/// broadcaster and the handler that ties them together.
pub fn init_app_state(config: Config) -> Result<AppState, Error> {
    let event_router = Arc::new(match config.routes_file() {
        Some(path) => EventRouter::from_file(path)?,
        None => EventRouter::dashboard()?,
    });
    info!("Routing {} events", event_router.event_count());

    let source = HttpSource::new(config.upstream_base_url())?;
    info!(
        "Upstream config: base_url={}, fetch_timeout={:?}, round_timeout={:?}",
        source.base_url(),
        config.fetch_timeout(),
        config.round_timeout(),
    );

    let fetcher = ParallelFetcher::new(Arc::new(source))
        .with_fetch_timeout(config.fetch_timeout())
        .with_round_timeout(config.round_timeout());

    let relay_manager = Arc::new(Manager::new(config.subscriber_buffer));

    let mut handler = RelayEventHandler::new(
        Arc::clone(&event_router),
        fetcher,
        Arc::clone(&relay_manager),
    );
    if config.coalesce_rounds {
        info!("Coalescing overlapping rounds per event");
        handler = handler.with_single_flight();
    }

    let event_publisher = EventPublisher::new().with_handler(Arc::new(handler));

    Ok(AppState {
        config,
        relay_manager,
        event_publisher,
        event_router,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("dashboard_relay").chain(args.iter().copied()))
            .unwrap()
    }

    #[tokio::test]
    async fn default_state_uses_built_in_routes() {
        let app_state = init_app_state(config(&[])).unwrap();

        assert_eq!(app_state.event_router.event_count(), 4);
        assert_eq!(app_state.event_publisher.handler_count(), 1);
        assert_eq!(app_state.relay_manager.subscriber_count().await, 0);
        assert_eq!(app_state.relay_manager.subscriber_buffer(), 64);
    }

    #[test]
    fn missing_routes_file_fails_startup() {
        let result = init_app_state(config(&[
            "--routes-file",
            "/nonexistent/dashboard-routes.json",
        ]));

        assert!(result.is_err());
    }

    #[test]
    fn malformed_upstream_url_fails_startup() {
        let result = init_app_state(config(&["--upstream-base-url", "not a url"]));

        assert!(result.is_err());
    }
}
