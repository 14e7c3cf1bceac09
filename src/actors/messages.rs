//! Message types for actor communication

use tokio::sync::oneshot;

/// Commands that can be sent to the [`MonitorActor`](super::monitor::MonitorActor)
#[derive(Debug)]
pub enum MonitorCommand {
    /// Refresh every registered campaign right away
    ///
    /// Does not reset the regular schedule.
    RefreshNow {
        /// Receives the number of applied updates
        respond_to: oneshot::Sender<anyhow::Result<usize>>,
    },

    /// Stop the loop
    ///
    /// A refresh already in progress is allowed to finish first.
    Shutdown,
}
