//! Process runtime: wires the scanner, executor, workers, and scheduler
//! together and drives them until shutdown.
//!
//! The host process (the web server role) owns the Postgres pool and the
//! source adapters; this runtime owns the worker tasks and scheduler
//! loops. Shutdown is cooperative and best-effort: workers stop pulling,
//! in-flight jobs finish, background loops are awaited with a grace
//! timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::deletion::DeletionExecutor;
use crate::queue::{JobQueue, QueueWorkers, RedisQueue, RuleScheduler};
use crate::scan::MaintenanceScanner;
use crate::sources::SourceSet;
use crate::store::MaintenanceStore;

/// Delay before the single retry of a failed start-up scheduler sync.
pub const SYNC_RETRY_DELAY: Duration = Duration::from_secs(30);

pub struct MaintenanceRuntime {
    workers: QueueWorkers,
    scheduler: Arc<RuleScheduler>,
    config: EngineConfig,
    shutdown: CancellationToken,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for MaintenanceRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaintenanceRuntime")
            .field("workers", &self.workers)
            .field("config", &self.config)
            .field("shutdown_cancelled", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl MaintenanceRuntime {
    pub fn new(
        store: Arc<dyn MaintenanceStore>,
        sources: SourceSet,
        queue: Arc<RedisQueue>,
        config: EngineConfig,
    ) -> Self {
        let scanner = Arc::new(MaintenanceScanner::new(
            Arc::clone(&store),
            sources.clone(),
        ));
        let executor = Arc::new(DeletionExecutor::new(
            Arc::clone(&store),
            sources,
        ));
        let shutdown = CancellationToken::new();
        let workers = QueueWorkers::new(
            Arc::clone(&queue),
            scanner,
            executor,
            config.clone(),
            shutdown.clone(),
        );
        let queue: Arc<dyn JobQueue> = queue;
        let scheduler = Arc::new(RuleScheduler::new(store, queue));

        Self {
            workers,
            scheduler,
            config,
            shutdown,
            background: Mutex::new(Vec::new()),
        }
    }

    /// Handle for producers (manual scan triggers, deletion enqueues) and
    /// the rule-save path (`sync`/`remove`).
    pub fn scheduler(&self) -> Arc<RuleScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Starts workers first so manually triggered jobs are served even
    /// while scheduler state is still being rebuilt from the store.
    pub async fn start(&self) {
        self.workers.start().await;

        let mut background = self.background.lock().await;
        background.push({
            let scheduler = Arc::clone(&self.scheduler);
            tokio::spawn(async move {
                let _ = scheduler.sync_all_with_retry(SYNC_RETRY_DELAY).await;
            })
        });
        background.push(self.scheduler.spawn_tick_loop(
            self.config.scheduler_tick_interval,
            self.shutdown.clone(),
        ));
        info!("maintenance runtime started");
    }

    pub async fn shutdown(&self) {
        info!("maintenance runtime shutting down");
        self.shutdown.cancel();
        self.workers.shutdown().await;

        let background = std::mem::take(&mut *self.background.lock().await);
        for handle in background {
            match tokio::time::timeout(self.config.shutdown_grace, handle)
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("background task failed: {err:?}"),
                Err(_) => warn!("background task timed out during shutdown"),
            }
        }
        info!("maintenance runtime shutdown complete");
    }

    /// Runs until SIGTERM/SIGINT, then shuts down gracefully.
    pub async fn run_until_signal(&self) {
        self.start().await;
        wait_for_signal().await;
        info!("shutdown signal received");
        self.shutdown().await;
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
