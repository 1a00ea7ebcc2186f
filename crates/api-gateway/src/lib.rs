//! API gateway for the app-microservice backends.
//!
//! Requests pass through an explicit pipeline: the [`cors`] stage answers
//! preflights and decorates every response, the [`router`] picks a backend by
//! longest path prefix, and [`proxy`] streams the request there and the answer
//! back. [`health`] probes all backends concurrently for `/services/health`.

pub mod config;
pub mod cors;
pub mod error;
pub mod health;
pub mod metrics;
pub mod proxy;
pub mod router;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use router::{BackendTarget, RouteTable};
pub use state::AppState;
