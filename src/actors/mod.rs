//! Background actors
//!
//! Each actor runs as its own tokio task and is controlled through a typed
//! handle that wraps an mpsc command channel. Request/response commands carry a
//! oneshot sender for the reply.
//!
//! ```text
//!   MonitorHandle ──commands──▶ MonitorActor ──updates──▶ CampaignTracker ──events──▶ Transport
//!                                    ▲
//!                                    └── MetricsSource
//! ```

pub mod messages;
pub mod monitor;
