use std::env;
use std::time::Duration;

/// Default Redis endpoint when `REDIS_URL` is unset. The connection is
/// lazy, so constructing config (or a queue) never touches the network.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Runtime tuning for the queue workers and the rule scheduler.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub redis_url: String,
    /// How often idle workers poll their queue.
    pub worker_poll_interval: Duration,
    /// How often the scheduler loop checks for due rules.
    pub scheduler_tick_interval: Duration,
    /// Grace period for in-flight jobs during shutdown.
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            worker_poll_interval: Duration::from_secs(1),
            scheduler_tick_interval: Duration::from_secs(15),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Reads configuration from the environment, falling back to defaults.
    /// Missing variables never fail: a worker must come up in environments
    /// without Redis and only error when a queue operation is attempted.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("REDIS_URL") {
            if !url.is_empty() {
                config.redis_url = url;
            }
        }
        if let Some(secs) = read_secs("PRUNARR_WORKER_POLL_SECS") {
            config.worker_poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = read_secs("PRUNARR_SCHEDULER_TICK_SECS") {
            config.scheduler_tick_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = read_secs("PRUNARR_SHUTDOWN_GRACE_SECS") {
            config.shutdown_grace = Duration::from_secs(secs);
        }
        config
    }
}

fn read_secs(name: &str) -> Option<u64> {
    env::var(name).ok()?.parse().ok()
}
