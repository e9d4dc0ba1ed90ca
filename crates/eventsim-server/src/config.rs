//! Server configuration

use eventsim_core::delivery::{DEFAULT_WEBHOOK_TIMEOUT, DEFAULT_WEBHOOK_URL};
use eventsim_core::{CatalogConfig, CatalogMode, DeliveryConfig, FaultPolicy, InjectionPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default and maximum record counts for the pull endpoints
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLimits {
    /// `/api/events` count (default: 50, max: 200)
    pub events_default: i64,
    pub events_max: usize,
    /// `/api/events/source/{source}` count (default: 20, max: 100)
    pub source_default: i64,
    pub source_max: usize,
    /// `/api/users` page size (default: 200, max: 200)
    pub users_default: i64,
    pub users_max: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            events_default: 50,
            events_max: 200,
            source_default: 20,
            source_max: 100,
            users_default: 200,
            users_max: 200,
        }
    }
}

/// HTTP Server Configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port to listen on (default: 9090)
    pub port: u16,
    /// Push target for the delivery loop
    pub webhook_url: String,
    /// Per-request webhook timeout (default: 5s)
    pub webhook_timeout: Duration,
    /// Start the delivery loop on boot (default: true)
    pub auto_start: bool,
    /// Delay before the auto-start (default: 5s)
    pub auto_start_delay: Duration,
    pub catalog: CatalogConfig,
    pub catalog_mode: CatalogMode,
    pub injection: InjectionPolicy,
    pub faults: FaultPolicy,
    pub delivery: DeliveryConfig,
    pub limits: QueryLimits,
    /// Seeds catalog generation and the delivery RNG
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
            auto_start: true,
            auto_start_delay: Duration::from_secs(5),
            catalog: CatalogConfig::default(),
            catalog_mode: CatalogMode::default(),
            injection: InjectionPolicy::default(),
            faults: FaultPolicy::default(),
            delivery: DeliveryConfig::default(),
            limits: QueryLimits::default(),
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
