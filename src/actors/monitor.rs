//! MonitorActor - periodically refreshes all registered campaigns
//!
//! ## Message Flow
//!
//! ```text
//! Start → refresh → sleep(interval) → refresh → ...
//!            │
//!            └─ error or panic → log → sleep(backoff) → refresh → ...
//!
//! Commands (RefreshNow, Shutdown) are checked before every sleep expires.
//! ```
//!
//! A failing refresh never ends the loop. Only a `Shutdown` command, or the
//! handle being dropped, does.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::source::MetricsSource;
use crate::tracker::CampaignTracker;

use super::messages::MonitorCommand;

/// Project id used when none is configured
pub const DEMO_PROJECT_ID: Uuid = Uuid::from_u128(0x12345678_1234_5678_9012_123456789012);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Project that refreshed updates and bootstrapped campaigns belong to
    pub project_id: Uuid,

    /// Delay between successful refreshes
    pub interval: Duration,

    /// Delay after a failed refresh
    pub backoff: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            project_id: DEMO_PROJECT_ID,
            interval: Duration::from_secs(30),
            backoff: Duration::from_secs(60),
        }
    }
}

pub struct MonitorActor {
    tracker: CampaignTracker,
    source: Arc<dyn MetricsSource>,
    settings: MonitorSettings,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<MonitorCommand>,
}

/// Clears the running flag when the loop task ends
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl MonitorActor {
    pub fn new(
        tracker: CampaignTracker,
        source: Arc<dyn MetricsSource>,
        settings: MonitorSettings,
        command_rx: mpsc::Receiver<MonitorCommand>,
    ) -> Self {
        Self {
            tracker,
            source,
            settings,
            command_rx,
        }
    }

    /// Run the actor's main loop until shut down
    #[instrument(skip(self), fields(project_id = %self.settings.project_id))]
    pub async fn run(mut self) {
        info!(
            "campaign monitoring started (interval {:?}, backoff {:?})",
            self.settings.interval, self.settings.backoff
        );

        // First refresh happens right away
        let mut next_refresh = Instant::now();

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::RefreshNow { respond_to }) => {
                            debug!("received RefreshNow command");
                            let result = self.refresh_guarded().await;
                            let _ = respond_to.send(result);
                        }

                        Some(MonitorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = sleep_until(next_refresh) => {
                    let delay = match self.refresh_guarded().await {
                        Ok(applied) => {
                            debug!("refreshed {applied} campaigns");
                            self.settings.interval
                        }
                        Err(e) => {
                            error!("error in monitoring loop: {e:#}");
                            self.settings.backoff
                        }
                    };
                    next_refresh = Instant::now() + delay;
                }
            }
        }

        info!("campaign monitoring stopped");
    }

    /// Refresh, turning a panic anywhere below into an error
    async fn refresh_guarded(&self) -> Result<usize> {
        match AssertUnwindSafe(self.refresh()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(anyhow::anyhow!(
                "refresh panicked: {}",
                panic_message(panic.as_ref())
            )),
        }
    }

    /// Pull fresh values for every registered campaign and apply them
    ///
    /// Returns the number of updates that were applied.
    async fn refresh(&self) -> Result<usize> {
        let project_id = self.settings.project_id;

        if self.tracker.is_empty().await {
            let campaigns = self
                .source
                .bootstrap()
                .await
                .context("failed to load bootstrap campaigns")?;

            for registration in &campaigns {
                self.tracker.register(project_id, registration).await;
            }

            if !campaigns.is_empty() {
                info!("registered {} bootstrap campaigns", campaigns.len());
            }
        }

        let campaigns = self.tracker.all().await;
        let updates = self
            .source
            .fetch(&campaigns)
            .await
            .context("failed to fetch campaign metrics")?;

        let mut applied = 0;
        for (campaign_id, update) in updates {
            if self
                .tracker
                .update(project_id, &campaign_id, update)
                .await
                .is_applied()
            {
                applied += 1;
            }
        }

        Ok(applied)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Cloneable sender for on-demand refreshes, usable without the handle
#[derive(Clone)]
pub struct Refresher {
    sender: mpsc::Sender<MonitorCommand>,
}

impl Refresher {
    /// Trigger an immediate refresh and wait for its result
    pub async fn refresh_now(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::RefreshNow { respond_to: tx })
            .await
            .context("failed to send RefreshNow command")?;

        rx.await.context("failed to receive response")?
    }
}

/// Handle for controlling a running [`MonitorActor`]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
    task: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl MonitorHandle {
    /// Spawn the actor as a tokio task
    pub fn spawn(
        tracker: CampaignTracker,
        source: Arc<dyn MetricsSource>,
        settings: MonitorSettings,
    ) -> Self {
        Self::spawn_with_flag(tracker, source, settings, Arc::new(AtomicBool::new(false)))
    }

    /// Spawn the actor, keeping `running` set for as long as the loop is alive
    ///
    /// The flag can be read without going through the handle.
    pub fn spawn_with_flag(
        tracker: CampaignTracker,
        source: Arc<dyn MetricsSource>,
        settings: MonitorSettings,
        running: Arc<AtomicBool>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        running.store(true, Ordering::SeqCst);
        let guard = RunningGuard(running.clone());
        let actor = MonitorActor::new(tracker, source, settings, cmd_rx);
        let task = tokio::spawn(async move {
            let _guard = guard;
            actor.run().await;
        });

        Self {
            sender: cmd_tx,
            task,
            running,
        }
    }

    /// Whether the loop task is still alive
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn refresher(&self) -> Refresher {
        Refresher {
            sender: self.sender.clone(),
        }
    }

    /// Trigger an immediate refresh and wait for its result
    pub async fn refresh_now(&self) -> Result<usize> {
        self.refresher().refresh_now().await
    }

    /// Stop the loop and wait for the task to finish
    pub async fn shutdown(self) -> Result<()> {
        if self.sender.send(MonitorCommand::Shutdown).await.is_err() {
            debug!("monitor task already gone");
        }

        self.task.await.context("monitor task failed")
    }
}
