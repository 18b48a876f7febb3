//! Domain layer of the dashboard relay: which data an event invalidates and how
//! that data is gathered from the upstream service.

pub mod error;
pub mod fetcher;
pub mod gateway;
pub mod resource;
pub mod routing;

pub use error::Error;
pub use fetcher::{ParallelFetcher, ResourceSource};
pub use resource::{EndpointSet, PartialResult, ResourceDescriptor};
pub use routing::EventRouter;
