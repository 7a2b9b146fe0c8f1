//! Poll loop that drives the engine from the store and hands firings to the
//! notifier.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::core::engine::{Firing, LoopEngine};
use crate::notify::Notifier;
use crate::store::LoopStore;

pub struct Host {
    store: Arc<dyn LoopStore>,
    notifier: Arc<dyn Notifier>,
    engine: LoopEngine,
    poll_interval: Duration,
}

impl Host {
    pub fn new(
        store: Arc<dyn LoopStore>,
        notifier: Arc<dyn Notifier>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            engine: LoopEngine::new(),
            poll_interval,
        }
    }

    /// One poll at `now`. Returns the firings handed to the notifier,
    /// whether or not delivery succeeded.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Firing> {
        let snapshot = match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Skipping poll, could not load loop: {}", e);
                return Vec::new();
            }
        };

        let fired = self
            .engine
            .poll_notifications(now, &snapshot.config, &snapshot.markers);
        for firing in &fired {
            if let Err(e) = self.notifier.notify(firing) {
                log::error!("Failed to deliver {:?}: {}", firing.text, e);
            }
        }
        fired
    }

    /// Poll until `shutdown` completes.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        log::info!("Watching loop every {} ms", self.poll_interval.as_millis());
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Stopped watching loop");
                    break;
                }
                _ = interval.tick() => {
                    self.tick(Utc::now());
                }
            }
        }
    }
}
