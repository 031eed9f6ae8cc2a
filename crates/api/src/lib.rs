//! Communications ingress API library.
//!
//! Exposes the building blocks (config, state, error handling, routes, local
//! bus wiring) so integration tests and the binary entrypoint can both
//! access them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod local_bus;
pub mod router;
pub mod routes;
pub mod state;
