//! HTTP Pull API and Generator Control
//!
//! - `GET  /api/events`                 random events, may fail or stall
//! - `GET  /api/events/source/{source}` random events tagged with `source`
//! - `GET  /api/content`                the whole content catalog
//! - `GET  /api/users`                  offset-paginated user catalog
//! - `GET  /health`                     liveness + delivery loop state
//! - `POST /start-generator`            switch the delivery loop on
//! - `POST /stop-generator`             switch it off
//! - `GET  /metrics`                    Prometheus exposition
//!
//! Every route is wrapped in a permissive CORS layer and request tracing.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eventsim_core::{
    Catalogs, Content, DeliveryConfig, DeliveryController, Event, EventSink, Fault, FaultPolicy,
    Source, Synthesizer, User,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};

use crate::config::{QueryLimits, ServerConfig};
use crate::error::ApiError;
use crate::metrics;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub synthesizer: Arc<Synthesizer>,
    pub controller: Arc<DeliveryController>,
    pub faults: FaultPolicy,
    pub limits: QueryLimits,
}

impl AppState {
    /// Generate the catalogs and wire the synthesizer into a controller
    /// that pushes to `sink`. The delivery loop is left stopped.
    pub fn new(config: &ServerConfig, sink: Arc<dyn EventSink>) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let catalogs = Arc::new(Catalogs::generate(&config.catalog, &mut rng));
        let synthesizer = Arc::new(
            Synthesizer::new(catalogs)
                .with_mode(config.catalog_mode)
                .with_policy(config.injection),
        );
        info!(
            users = synthesizer.catalogs().users().len(),
            content = synthesizer.catalogs().content().len(),
            mode = ?synthesizer.mode(),
            defect_rate = synthesizer.policy().effective_defect_rate(),
            duplicate_rate = synthesizer.policy().duplicate_rate,
            "Catalogs generated"
        );

        let delivery = DeliveryConfig {
            seed: config.seed.or(config.delivery.seed),
            ..config.delivery.clone()
        };
        let controller = Arc::new(DeliveryController::new(
            synthesizer.clone(),
            sink,
            delivery,
        ));

        Self {
            synthesizer,
            controller,
            faults: config.faults,
            limits: config.limits,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/events/source/{source}", get(events_for_source))
        .route("/api/content", get(list_content))
        .route("/api/users", get(list_users))
        .route("/health", get(health))
        .route("/start-generator", post(start_generator))
        .route("/stop-generator", post(stop_generator))
        .route("/metrics", get(metrics_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Query parameters
// ============================================================================

type Params = Query<HashMap<String, String>>;

/// Integer parameter; missing or unparseable values fall back to `default`.
fn int_param(params: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    params
        .get(key)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

/// Record count in `[0, max]`; negative requests yield nothing.
fn bounded_count(params: &HashMap<String, String>, default: i64, max: usize) -> usize {
    usize::try_from(int_param(params, "count", default))
        .unwrap_or(0)
        .min(max)
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub total_count: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct SourceEventsResponse {
    pub events: Vec<Event>,
}

#[derive(Debug, Serialize)]
struct ContentResponse<'a> {
    content: &'a [Content],
    count: usize,
    total_content: usize,
}

#[derive(Debug, Serialize)]
struct UsersResponse<'a> {
    users: &'a [User],
    count: usize,
    total_users: usize,
    offset: usize,
    limit: usize,
    has_more: bool,
    next_offset: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub generator_running: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_events(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Json<EventsResponse>, ApiError> {
    let count = bounded_count(&params, state.limits.events_default, state.limits.events_max);

    // ThreadRng is !Send; keep it out of the await below
    let (events, fault) = {
        let mut rng = rand::rng();
        let events = state.synthesizer.synthesize_many(&mut rng, count);
        (events, state.faults.roll(&mut rng))
    };
    metrics::EVENTS_SERVED.inc_by(events.len() as u64);

    match fault {
        Fault::Unavailable => {
            metrics::SIMULATED_ERRORS.inc();
            debug!(count, "Simulating unavailable upstream");
            return Err(ApiError::Unavailable);
        }
        Fault::Stall(stall) => {
            metrics::SIMULATED_STALLS.inc();
            debug!(?stall, "Simulating slow upstream");
            tokio::time::sleep(stall).await;
        }
        Fault::None => {}
    }

    debug!(count, events = events.len(), "Serving events");
    Ok(Json(EventsResponse {
        total_count: events.len(),
        events,
        has_more: true,
    }))
}

async fn events_for_source(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(params): Params,
) -> Json<SourceEventsResponse> {
    let count = bounded_count(&params, state.limits.source_default, state.limits.source_max);
    let source = Source::from(source);

    let mut rng = rand::rng();
    let events: Vec<Event> = (0..count)
        .map(|_| {
            let mut event = state.synthesizer.synthesize_single(&mut rng);
            event.source = source.clone();
            event
        })
        .collect();
    metrics::EVENTS_SERVED.inc_by(events.len() as u64);

    debug!(%source, events = events.len(), "Serving events for source");
    Json(SourceEventsResponse { events })
}

async fn list_content(State(state): State<AppState>) -> Response {
    let content = state.synthesizer.catalogs().content();
    Json(ContentResponse {
        content,
        count: content.len(),
        total_content: content.len(),
    })
    .into_response()
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Response, ApiError> {
    let offset = int_param(&params, "offset", 0);
    let limit = int_param(&params, "limit", state.limits.users_default);

    let page = state
        .synthesizer
        .catalogs()
        .user_page(offset, limit, state.limits.users_max)
        .ok_or_else(|| {
            debug!(offset, "Rejecting user page request");
            ApiError::InvalidOffset
        })?;

    Ok(Json(UsersResponse {
        users: page.users,
        count: page.users.len(),
        total_users: page.total,
        offset: page.offset,
        limit: page.limit,
        has_more: page.has_more,
        next_offset: page.next_offset,
    })
    .into_response())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        generator_running: state.controller.is_running(),
    })
}

async fn start_generator(State(state): State<AppState>) -> Json<MessageResponse> {
    state.controller.start();
    Json(MessageResponse {
        message: "Event generator started",
    })
}

async fn stop_generator(State(state): State<AppState>) -> Json<MessageResponse> {
    state.controller.stop();
    Json(MessageResponse {
        message: "Event generator stopped",
    })
}

async fn metrics_handler(State(state): State<AppState>) -> Result<String, ApiError> {
    metrics::observe_delivery(&state.controller.stats(), state.controller.is_running());
    metrics::render()
}
