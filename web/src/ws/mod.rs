//! WebSocket HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for the push channel.
//! The subscriber registry and broadcast fan-out live in the `relay` crate so
//! the refresh pipeline can reach them without depending on `web`.

pub mod handler;
