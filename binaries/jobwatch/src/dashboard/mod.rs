//! Job status view-models and the machinery that keeps them fresh.

pub mod batch;
pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod flow;
pub mod format;
pub mod job;
pub mod metrics;
pub mod poller;
pub mod state;
pub mod updates;
pub mod watch;

#[cfg(test)]
mod tests;

pub use batch::{BatchViewModel, MetricDisplay, MetricGroup};
pub use config::WatchConfig;
pub use context::{UnitKind, UnitTable, ViewModelContext};
pub use error::{FindError, ViewModelError};
pub use flow::FlowViewModel;
pub use job::{JobCore, JobKind, JobSnapshot, JobView, MetaEntry, NO_DATE};
pub use metrics::{MetricTracker, MetricsPoll, PollDescriptor, PollTicket};
pub use poller::{PollHandle, spawn_poller};
pub use state::{ActionIcon, JobState};
pub use updates::StateUpdate;
pub use watch::{WatchTarget, watch};
