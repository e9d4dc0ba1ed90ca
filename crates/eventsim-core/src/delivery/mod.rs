//! Delivery Loop Controller
//!
//! A start/stop switch that owns one background task. While running, the
//! task repeatedly synthesizes a batch, pushes it to an [`EventSink`] and
//! sleeps for a random pause.
//!
//! ```text
//!            start()                      stop()
//!   Stopped ─────────► Running ──────────────────► Stopped
//!      ▲     (spawn)      │  (cancel run token)       │
//!      └──────────────────┴───────────────────────────┘
//!
//!   worker:  ┌─► token cancelled? ── yes ──► exit
//!            │        │ no
//!            │   synthesize 1..=10 records
//!            │   POST {"events": [...]}      (failures logged, never fatal)
//!            └── sleep 2..=5 s
//! ```
//!
//! Cancellation is cooperative. `stop()` never interrupts an in-flight POST
//! or a pause; the worker notices at the top of its next iteration. Each run
//! gets its own token, so a stop/start pair issued while the old worker is
//! still sleeping leaves that worker to exit on its own without delivering.

pub mod sink;

pub use sink::{DEFAULT_WEBHOOK_TIMEOUT, DEFAULT_WEBHOOK_URL, EventSink, WebhookSink};

use parking_lot::Mutex;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DeliveryError;
use crate::event::EventBatch;
use crate::synthesizer::Synthesizer;

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Fewest synthesize calls per batch (default: 1)
    pub batch_min: usize,
    /// Most synthesize calls per batch (default: 10)
    pub batch_max: usize,
    /// Shortest pause between batches (default: 2s)
    pub pause_min: Duration,
    /// Longest pause between batches (default: 5s)
    pub pause_max: Duration,
    /// Seed for the worker RNG; `None` seeds from the thread RNG
    pub seed: Option<u64>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            batch_min: 1,
            batch_max: 10,
            pause_min: Duration::from_secs(2),
            pause_max: Duration::from_secs(5),
            seed: None,
        }
    }
}

impl DeliveryConfig {
    fn batch_range(&self) -> RangeInclusive<usize> {
        let min = self.batch_min.max(1);
        min..=self.batch_max.max(min)
    }

    fn pause_range(&self) -> RangeInclusive<Duration> {
        self.pause_min..=self.pause_max.max(self.pause_min)
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Default)]
pub struct DeliveryStats {
    pub batches_sent: AtomicU64,
    pub events_sent: AtomicU64,
    pub failures: AtomicU64,
    pub serialize_errors: AtomicU64,
    /// Workers currently inside their loop
    pub active_tasks: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub batches_sent: u64,
    pub events_sent: u64,
    pub failures: u64,
    pub serialize_errors: u64,
    pub active_tasks: usize,
}

impl DeliveryStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            serialize_errors: self.serialize_errors.load(Ordering::Relaxed),
            active_tasks: self.active_tasks.load(Ordering::SeqCst),
        }
    }
}

/// Counts a worker as active for as long as it is alive
struct ActiveTask(Arc<DeliveryStats>);

impl ActiveTask {
    fn enter(stats: Arc<DeliveryStats>) -> Self {
        stats.active_tasks.fetch_add(1, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for ActiveTask {
    fn drop(&mut self) {
        self.0.active_tasks.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Controller
// ============================================================================

struct LoopState {
    running: bool,
    cancel: CancellationToken,
    /// Workers not yet reaped; a stopped worker may still be mid-pause
    handles: Vec<JoinHandle<()>>,
    runs: u64,
}

/// Owner of the background delivery task.
///
/// Construct once and share by `Arc`. `start` spawns onto the current Tokio
/// runtime and must be called from within one.
pub struct DeliveryController {
    synthesizer: Arc<Synthesizer>,
    sink: Arc<dyn EventSink>,
    config: DeliveryConfig,
    state: Mutex<LoopState>,
    stats: Arc<DeliveryStats>,
}

impl DeliveryController {
    pub fn new(
        synthesizer: Arc<Synthesizer>,
        sink: Arc<dyn EventSink>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            config,
            state: Mutex::new(LoopState {
                running: false,
                cancel: CancellationToken::new(),
                handles: Vec::new(),
                runs: 0,
            }),
            stats: Arc::new(DeliveryStats::default()),
        }
    }

    /// Switch on. Returns `true` if this call spawned the worker.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        if state.running {
            debug!("Event generator already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let worker = DeliveryWorker {
            synthesizer: self.synthesizer.clone(),
            sink: self.sink.clone(),
            config: self.config.clone(),
            stats: self.stats.clone(),
            cancel: cancel.clone(),
            rng: self.worker_rng(state.runs),
            run: state.runs,
        };

        state.handles.retain(|handle| !handle.is_finished());
        state.handles.push(tokio::spawn(worker.run()));
        state.cancel = cancel;
        state.running = true;
        state.runs += 1;

        info!(target = self.sink.target(), "Event generator started");
        true
    }

    /// Switch off. Returns `true` if the generator was running.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running {
            debug!("Event generator already stopped");
            return false;
        }

        state.running = false;
        state.cancel.cancel();

        info!("Event generator stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Workers currently alive (at most one is ever delivering)
    pub fn active_tasks(&self) -> usize {
        self.stats.active_tasks.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop and wait up to `grace` for every live worker to finish.
    /// Workers still busy at the deadline are aborted and reaped.
    pub async fn shutdown(&self, grace: Duration) {
        self.stop();

        let handles = std::mem::take(&mut self.state.lock().handles);
        let deadline = tokio::time::Instant::now() + grace;

        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                warn!(?grace, "Delivery loop still busy after grace period, aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
    }

    fn worker_rng(&self, run: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(run)),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

struct DeliveryWorker {
    synthesizer: Arc<Synthesizer>,
    sink: Arc<dyn EventSink>,
    config: DeliveryConfig,
    stats: Arc<DeliveryStats>,
    cancel: CancellationToken,
    rng: StdRng,
    run: u64,
}

impl DeliveryWorker {
    async fn run(mut self) {
        let _active = ActiveTask::enter(self.stats.clone());
        info!(run = self.run, target = self.sink.target(), "Delivery loop active");

        while !self.cancel.is_cancelled() {
            let calls = self.rng.random_range(self.config.batch_range());
            let batch = EventBatch::new(self.synthesizer.synthesize_many(&mut self.rng, calls));
            let pause = self.rng.random_range(self.config.pause_range());

            match self.sink.deliver(&batch).await {
                Ok(()) => {
                    self.stats.batches_sent.fetch_add(1, Ordering::Relaxed);
                    self.stats
                        .events_sent
                        .fetch_add(batch.len() as u64, Ordering::Relaxed);
                    debug!(run = self.run, events = batch.len(), "Batch delivered");
                }
                Err(DeliveryError::Serialize(e)) => {
                    self.stats.serialize_errors.fetch_add(1, Ordering::Relaxed);
                    error!(run = self.run, error = %e, "Skipping batch that failed to encode");
                }
                Err(e) => {
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(run = self.run, events = batch.len(), error = %e, "Webhook delivery failed");
                }
            }

            tokio::time::sleep(pause).await;
        }

        info!(run = self.run, "Delivery loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogConfig, Catalogs};
    use crate::error::Result;
    use crate::policy::InjectionPolicy;
    use async_trait::async_trait;
    use std::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<EventBatch>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        fn target(&self) -> &str {
            "memory"
        }

        async fn deliver(&self, batch: &EventBatch) -> Result<()> {
            self.batches.lock().push(batch.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        fn target(&self) -> &str {
            "nowhere"
        }

        async fn deliver(&self, _batch: &EventBatch) -> Result<()> {
            Err(DeliveryError::Status { status: 500 })
        }
    }

    fn synthesizer(policy: InjectionPolicy) -> Arc<Synthesizer> {
        let config = CatalogConfig {
            users: 100,
            content: 10,
        };
        let catalogs = Catalogs::generate(&config, &mut StdRng::seed_from_u64(5));
        Arc::new(Synthesizer::new(Arc::new(catalogs)).with_policy(policy))
    }

    fn fast_config(pause: Duration) -> DeliveryConfig {
        DeliveryConfig {
            pause_min: pause,
            pause_max: pause,
            seed: Some(42),
            ..DeliveryConfig::default()
        }
    }

    async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        condition()
    }

    #[tokio::test]
    async fn test_start_stop_cycle() {
        let controller = DeliveryController::new(
            synthesizer(InjectionPolicy::default()),
            Arc::new(RecordingSink::default()),
            fast_config(Duration::from_millis(5)),
        );

        assert!(!controller.is_running());
        assert!(controller.start());
        assert!(controller.is_running());
        assert!(controller.stop());
        assert!(!controller.is_running());
        assert!(!controller.stop());

        assert!(wait_until(Duration::from_secs(2), || controller.active_tasks() == 0).await);
    }

    #[tokio::test]
    async fn test_double_start_spawns_one_worker() {
        let controller = DeliveryController::new(
            synthesizer(InjectionPolicy::default()),
            Arc::new(RecordingSink::default()),
            fast_config(Duration::from_millis(5)),
        );

        assert!(controller.start());
        assert!(!controller.start());

        assert!(wait_until(Duration::from_secs(2), || controller.active_tasks() == 1).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.active_tasks(), 1);

        controller.shutdown(Duration::from_secs(1)).await;
        assert_eq!(controller.active_tasks(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_starts_spawn_one_worker() {
        let controller = Arc::new(DeliveryController::new(
            synthesizer(InjectionPolicy::default()),
            Arc::new(RecordingSink::default()),
            fast_config(Duration::from_millis(5)),
        ));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let controller = controller.clone();
            handles.push(tokio::spawn(async move { controller.start() }));
        }

        let mut spawned = 0;
        for handle in handles {
            if handle.await.unwrap() {
                spawned += 1;
            }
        }
        assert_eq!(spawned, 1);

        assert!(wait_until(Duration::from_secs(2), || controller.active_tasks() == 1).await);
        controller.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_batches_reach_sink() {
        let sink = Arc::new(RecordingSink::default());
        let controller = DeliveryController::new(
            synthesizer(InjectionPolicy::clean()),
            sink.clone(),
            fast_config(Duration::from_millis(2)),
        );

        controller.start();
        assert!(wait_until(Duration::from_secs(2), || sink.batches.lock().len() >= 5).await);
        controller.shutdown(Duration::from_secs(1)).await;

        let batches = sink.batches.lock();
        for batch in batches.iter() {
            assert!((1..=10).contains(&batch.len()), "batch of {}", batch.len());
        }

        let stats = controller.stats();
        assert_eq!(stats.batches_sent as usize, batches.len());
        assert_eq!(
            stats.events_sent as usize,
            batches.iter().map(EventBatch::len).sum::<usize>()
        );
    }

    #[tokio::test]
    async fn test_duplicates_can_double_batch_size() {
        let sink = Arc::new(RecordingSink::default());
        let policy = InjectionPolicy {
            duplicate_rate: 1.0,
            ..InjectionPolicy::clean()
        };
        let controller = DeliveryController::new(
            synthesizer(policy),
            sink.clone(),
            fast_config(Duration::from_millis(2)),
        );

        controller.start();
        assert!(wait_until(Duration::from_secs(2), || sink.batches.lock().len() >= 3).await);
        controller.shutdown(Duration::from_secs(1)).await;

        for batch in sink.batches.lock().iter() {
            assert!(batch.len() % 2 == 0 && (2..=20).contains(&batch.len()));
        }
    }

    #[tokio::test]
    async fn test_failures_keep_loop_alive() {
        let controller = DeliveryController::new(
            synthesizer(InjectionPolicy::default()),
            Arc::new(FailingSink),
            fast_config(Duration::from_millis(2)),
        );

        controller.start();
        assert!(wait_until(Duration::from_secs(2), || controller.stats().failures >= 3).await);
        assert!(controller.is_running());
        assert_eq!(controller.active_tasks(), 1);

        controller.shutdown(Duration::from_secs(1)).await;
        assert_eq!(controller.stats().batches_sent, 0);
    }

    #[tokio::test]
    async fn test_stop_waits_for_current_pause() {
        let sink = Arc::new(RecordingSink::default());
        let controller = DeliveryController::new(
            synthesizer(InjectionPolicy::clean()),
            sink.clone(),
            fast_config(Duration::from_millis(200)),
        );

        controller.start();
        assert!(wait_until(Duration::from_secs(2), || sink.batches.lock().len() == 1).await);
        controller.stop();

        // The worker is mid-pause; it exits only once the pause ends.
        assert_eq!(controller.active_tasks(), 1);
        assert!(wait_until(Duration::from_secs(2), || controller.active_tasks() == 0).await);
        assert_eq!(sink.batches.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_during_pause_leaves_one_worker() {
        let sink = Arc::new(RecordingSink::default());
        let controller = DeliveryController::new(
            synthesizer(InjectionPolicy::clean()),
            sink.clone(),
            fast_config(Duration::from_millis(150)),
        );

        controller.start();
        assert!(wait_until(Duration::from_secs(2), || sink.batches.lock().len() == 1).await);
        controller.stop();
        assert!(controller.start());

        // Old worker is still sleeping, new one is already delivering.
        assert!(wait_until(Duration::from_secs(2), || controller.active_tasks() == 1).await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(controller.active_tasks(), 1);
        assert!(controller.is_running());

        controller.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_shutdown_reaps_every_worker() {
        let sink = Arc::new(RecordingSink::default());
        let controller = DeliveryController::new(
            synthesizer(InjectionPolicy::clean()),
            sink.clone(),
            fast_config(Duration::from_millis(800)),
        );

        controller.start();
        assert!(wait_until(Duration::from_secs(2), || sink.batches.lock().len() == 1).await);
        controller.stop();
        controller.start();
        assert!(wait_until(Duration::from_secs(2), || sink.batches.lock().len() == 2).await);
        assert_eq!(controller.active_tasks(), 2);

        // Both workers are mid-pause past the grace period
        controller.shutdown(Duration::from_millis(300)).await;
        assert_eq!(controller.active_tasks(), 0);
        assert!(!controller.is_running());
    }
}
