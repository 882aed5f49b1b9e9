//! Recurring and event-driven dashboard refreshes.

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use concierge_tickets::{TicketEvent, TicketEventSink};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{info, warn};

use crate::dashboard_publisher::DashboardPublisher;

#[derive(Debug)]
pub struct DashboardRefresherHandle {
    interval: Duration,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DashboardRefresherHandle {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Refreshes the dashboard every `interval`, first tick one interval after start.
pub fn start_dashboard_refresher(
    publisher: Arc<DashboardPublisher>,
    interval: Duration,
) -> Result<DashboardRefresherHandle> {
    if interval.is_zero() {
        bail!("dashboard refresh interval must be greater than zero");
    }
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(run_dashboard_refresh_loop(publisher, interval, shutdown_rx));
    let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    info!(interval_ms, "dashboard refresher started");
    Ok(DashboardRefresherHandle {
        interval,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

async fn run_dashboard_refresh_loop(
    publisher: Arc<DashboardPublisher>,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(error) = publisher.refresh().await {
                    warn!(error = %error, "scheduled dashboard refresh failed");
                }
            }
            _ = &mut shutdown_rx => {
                info!("dashboard refresher stopped");
                break;
            }
        }
    }
}

/// Refreshes the dashboard whenever the number of live tickets changes.
pub struct DashboardEventSink {
    publisher: Arc<DashboardPublisher>,
}

impl DashboardEventSink {
    pub fn new(publisher: Arc<DashboardPublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl TicketEventSink for DashboardEventSink {
    fn name(&self) -> &'static str {
        "dashboard_refresh"
    }

    async fn handle(&self, event: &TicketEvent) -> Result<()> {
        if !event.changes_active_count() {
            return Ok(());
        }
        self.publisher
            .refresh()
            .await
            .context("dashboard refresh after ticket event failed")?;
        Ok(())
    }
}
