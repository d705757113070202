//! Idle supervision of the agent link.
//!
//! When idle restarts are enabled and no chat request arrived for longer than
//! the configured timeout, the agent is told to reconnect and the current link
//! is dropped. The agent's fresh connection then starts from a clean page.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arena_bridge_types::protocol::Command;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::bridge::link::LinkRegistry;
use crate::modules::config::ConfigStore;

/// Default interval between idle checks.
pub const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Last time the API was used.
#[derive(Debug)]
pub struct ActivityTracker {
    last: Mutex<Instant>,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self { last: Mutex::new(Instant::now()) }
    }

    pub fn touch(&self) {
        *self.last.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last.lock().elapsed()
    }
}

/// Periodic idle check.
pub struct IdleSupervisor {
    registry: Arc<LinkRegistry>,
    activity: Arc<ActivityTracker>,
    config: ConfigStore,
    interval: Duration,
}

impl IdleSupervisor {
    pub fn new(registry: Arc<LinkRegistry>, activity: Arc<ActivityTracker>, config: ConfigStore) -> Self {
        Self { registry, activity, config, interval: IDLE_CHECK_INTERVAL }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one check. Returns `true` if the link was recycled.
    pub fn check(&self) -> bool {
        let Some(timeout_secs) = self.config.current().idle_timeout_secs() else {
            return false;
        };
        let idle = self.activity.idle_for();
        if idle <= Duration::from_secs(timeout_secs) {
            return false;
        }

        tracing::info!("Idle for {}s (limit {}s), recycling the agent link", idle.as_secs(), timeout_secs);
        self.activity.touch();

        let Ok(link) = self.registry.current_link() else {
            tracing::debug!("No agent link to recycle");
            return false;
        };
        if let Err(e) = self.registry.send_command(Command::Reconnect) {
            tracing::warn!("Failed to send reconnect command: {}", e);
        }
        self.registry.detach(link.id())
    }

    /// Run checks forever on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Idle supervisor started (interval {:?})", self.interval);
            let mut ticker = tokio::time::interval(self.interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.check();
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arena_bridge_types::protocol::OutboundFrame;
    use arena_bridge_types::{BridgeConfig, EndpointTable, ModelTable};
    use tokio::sync::mpsc;

    fn store(enabled: bool, timeout: i64) -> ConfigStore {
        ConfigStore::fixed(
            BridgeConfig {
                enable_idle_restart: enabled,
                idle_restart_timeout_seconds: timeout,
                ..Default::default()
            },
            ModelTable::default(),
            EndpointTable::default(),
        )
    }

    #[tokio::test]
    async fn test_idle_link_is_recycled() {
        let registry = Arc::new(LinkRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.attach(tx);
        let _inbox = registry.register("req").unwrap();

        let activity = Arc::new(ActivityTracker::new());
        let supervisor = IdleSupervisor::new(Arc::clone(&registry), Arc::clone(&activity), store(true, 0));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(supervisor.check());
        assert_eq!(rx.recv().await, Some(OutboundFrame::Command { command: Command::Reconnect }));
        assert!(!registry.is_connected());
        assert_eq!(registry.pending_count(), 0);
        assert!(activity.idle_for() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_disabled_or_active_does_nothing() {
        let registry = Arc::new(LinkRegistry::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.attach(tx);
        let activity = Arc::new(ActivityTracker::new());

        let disabled = IdleSupervisor::new(Arc::clone(&registry), Arc::clone(&activity), store(false, 0));
        let minus_one = IdleSupervisor::new(Arc::clone(&registry), Arc::clone(&activity), store(true, -1));
        let fresh = IdleSupervisor::new(Arc::clone(&registry), Arc::clone(&activity), store(true, 300));

        assert!(!disabled.check());
        assert!(!minus_one.check());
        assert!(!fresh.check());
        assert!(registry.is_connected());
    }
}
