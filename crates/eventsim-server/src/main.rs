//! eventsim - synthetic event source for ingestion pipelines
//!
//! Usage:
//!   eventsim
//!   eventsim --port 9090 --webhook-url http://localhost:4000/webhook/events
//!   eventsim --no-auto-start --error-rate 0 --latency-rate 0
//!   eventsim --catalog-mode bare --no-defects --seed 42

use anyhow::Context;
use clap::{Parser, ValueEnum};
use eventsim_core::{CatalogMode, FaultPolicy, InjectionPolicy, WebhookSink};
use eventsim_server::{AppState, ServerConfig, create_router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "eventsim")]
#[command(about = "Synthetic user-activity events with injected defects and faults")]
struct Cli {
    /// Webhook the delivery loop pushes batches to
    #[arg(long, env = "WEBHOOK_URL", default_value = eventsim_core::delivery::DEFAULT_WEBHOOK_URL)]
    webhook_url: String,

    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "9090")]
    port: u16,

    /// Seconds to wait before switching the delivery loop on
    #[arg(long, default_value = "5")]
    auto_start_delay_secs: u64,

    /// Leave the delivery loop off until POST /start-generator
    #[arg(long)]
    no_auto_start: bool,

    /// Full user/content records in events, or bare identifiers
    #[arg(long, value_enum, default_value = "rich")]
    catalog_mode: ModeArg,

    /// Disable timestamp/user defect injection
    #[arg(long)]
    no_defects: bool,

    /// Seed for catalogs and the delivery loop
    #[arg(long, env = "EVENTSIM_SEED")]
    seed: Option<u64>,

    /// Probability a /api/events request answers 503
    #[arg(long, default_value_t = eventsim_core::policy::DEFAULT_ERROR_RATE)]
    error_rate: f64,

    /// Probability a /api/events request stalls
    #[arg(long, default_value_t = eventsim_core::policy::DEFAULT_LATENCY_RATE)]
    latency_rate: f64,

    /// Stall length in seconds
    #[arg(long, default_value = "10")]
    latency_secs: u64,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Rich,
    Bare,
}

impl From<ModeArg> for CatalogMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rich => CatalogMode::Rich,
            ModeArg::Bare => CatalogMode::Bare,
        }
    }
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let mut injection = InjectionPolicy::default();
        if self.no_defects {
            injection = injection.without_defects();
        }

        ServerConfig {
            host: self.host,
            port: self.port,
            webhook_url: self.webhook_url,
            auto_start: !self.no_auto_start,
            auto_start_delay: Duration::from_secs(self.auto_start_delay_secs),
            catalog_mode: self.catalog_mode.into(),
            injection,
            faults: FaultPolicy {
                error_rate: self.error_rate,
                latency_rate: self.latency_rate,
                stall: Duration::from_secs(self.latency_secs),
            },
            seed: self.seed,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();
    info!("Initializing eventsim v{}", env!("CARGO_PKG_VERSION"));

    let sink = WebhookSink::new(config.webhook_url.clone(), config.webhook_timeout)
        .context("failed to build webhook client")?;
    let state = AppState::new(&config, Arc::new(sink));
    let controller = state.controller.clone();

    if config.auto_start {
        let controller = controller.clone();
        let delay = config.auto_start_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.start();
        });
    }

    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        addr = %addr,
        webhook = %config.webhook_url,
        auto_start = config.auto_start,
        "Mock data service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await
        .context("server error")?;

    controller.shutdown(SHUTDOWN_GRACE).await;
    info!("Shutdown complete");
    Ok(())
}
