//! Contact-matching backend: candidate scoring, swipe reciprocity,
//! clique-based interest groups, and realtime notification delivery.
//!
//! The crate follows a hexagonal layout: [`domain`] holds entities,
//! services, and port traits; [`inbound`] adapts HTTP and WebSocket
//! traffic onto the services; [`outbound`] implements the ports against
//! PostgreSQL, Redis, and in-process broadcast channels; [`server`] wires
//! a configuration into a running Actix server.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use middleware::Trace;
