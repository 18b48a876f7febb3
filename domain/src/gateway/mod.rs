//! Clients for the services the relay reads from.

pub mod upstream;
