//! # eventsim-server - Mock Upstream Data Service
//!
//! HTTP surface over [`eventsim_core`]: pull endpoints that synthesize events
//! on demand (with simulated 503s and stalls), catalog listings, and the
//! start/stop switch for the webhook delivery loop.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;

pub use api::{AppState, create_router};
pub use config::{QueryLimits, ServerConfig};
pub use error::ApiError;
