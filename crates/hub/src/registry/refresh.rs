// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background refresh of catalog sources.
//!
//! One long-lived task wakes at a fixed interval and refreshes, in sequence,
//! every configured source whose last success is older than the minimum
//! interval. The sources themselves (scrapers, API clients) are
//! collaborators behind [`CatalogSource`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::entry::{RegistryEntry, SourceType};
use super::store::{Registry, SourceRefreshStatus, SourceState};

/// A catalog source the scheduler can refresh.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Which source this is.
    fn source_type(&self) -> SourceType;

    /// Fetch the source's current entry set.
    async fn fetch(&self) -> anyhow::Result<Vec<RegistryEntry>>;
}

/// Drives periodic and forced refreshes of catalog sources.
pub struct RefreshScheduler {
    registry: Arc<Registry>,
    sources: Vec<Arc<dyn CatalogSource>>,
    wake_interval: Duration,
    min_interval: Duration,
    stop: watch::Sender<bool>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    /// Create a scheduler over the given sources.
    ///
    /// `wake_interval` is how often the task wakes to check (default 6 h in
    /// config); `min_interval` is the per-source refresh floor (default 24 h).
    pub fn new(
        registry: Arc<Registry>,
        sources: Vec<Arc<dyn CatalogSource>>,
        wake_interval: Duration,
        min_interval: Duration,
    ) -> Arc<Self> {
        let (stop, _) = watch::channel(false);
        Arc::new(Self {
            registry,
            sources,
            wake_interval,
            min_interval,
            stop,
            task: parking_lot::Mutex::new(None),
        })
    }

    /// Start the background task. Idempotent.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.is_some() {
            warn!("refresh scheduler already running");
            return;
        }
        info!(
            wake = ?self.wake_interval,
            min = ?self.min_interval,
            sources = self.sources.len(),
            "starting refresh scheduler"
        );
        let scheduler = Arc::clone(self);
        let stop_rx = self.stop.subscribe();
        *task = Some(tokio::spawn(run_loop(scheduler, stop_rx)));
    }

    /// Stop the background task and wait for it to wind down.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let abort = handle.abort_handle();
            if tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .is_err()
            {
                abort.abort();
            }
        }
    }

    /// Refresh every source that is due, sequentially.
    pub async fn refresh_due(&self) {
        for source in &self.sources {
            if self.is_due(source.source_type()).await {
                self.refresh(source).await;
            }
        }
    }

    /// Force a refresh of one source.
    ///
    /// Honors the minimum interval unless `override_interval` is set.
    /// Returns whether a refresh ran and succeeded.
    pub async fn force_refresh(&self, source_type: SourceType, override_interval: bool) -> bool {
        let Some(source) = self
            .sources
            .iter()
            .find(|s| s.source_type() == source_type)
        else {
            warn!(source = %source_type, "no refresh handler for source");
            return false;
        };

        if !override_interval && !self.is_due(source_type).await {
            info!(source = %source_type, "skipping refresh (within minimum interval)");
            return false;
        }

        self.refresh(source).await
    }

    async fn is_due(&self, source_type: SourceType) -> bool {
        let status = self.registry.source_status(source_type).await;
        match status.and_then(|s| s.last_refresh) {
            None => true,
            Some(last) => {
                let elapsed = Utc::now().signed_duration_since(last);
                elapsed.to_std().map(|e| e >= self.min_interval).unwrap_or(true)
            }
        }
    }

    async fn refresh(&self, source: &Arc<dyn CatalogSource>) -> bool {
        let source_type = source.source_type();
        info!(source = %source_type, "refreshing catalog source");

        let mut status = self
            .registry
            .source_status(source_type)
            .await
            .unwrap_or_else(|| SourceRefreshStatus::unknown(source_type));
        status.last_attempt = Some(Utc::now());
        status.state = SourceState::Refreshing;
        self.registry.set_source_status(status.clone()).await;

        match source.fetch().await {
            Ok(entries) => {
                let count = self.registry.bulk_upsert(entries).await;
                status.last_refresh = Some(Utc::now());
                status.entry_count = count;
                status.state = SourceState::Ok;
                status.error_message = None;
                self.registry.set_source_status(status).await;
                info!(source = %source_type, count, "catalog source refreshed");
                true
            }
            Err(err) => {
                error!(source = %source_type, error = %err, "catalog refresh failed");
                status.state = SourceState::Error;
                status.error_message = Some(err.to_string());
                self.registry.set_source_status(status).await;
                false
            }
        }
    }
}

async fn run_loop(scheduler: Arc<RefreshScheduler>, mut stop: watch::Receiver<bool>) {
    loop {
        scheduler.refresh_due().await;
        tokio::select! {
            _ = tokio::time::sleep(scheduler.wake_interval) => {}
            _ = stop.changed() => {
                if *stop.borrow() {
                    info!("refresh scheduler stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
