//! State and behaviour shared by flow and batch view-models.
//!
//! Both job kinds keep their identity, lifecycle state and metric series in
//! a [`JobCore`]; everything the UI derives from those lives as default
//! methods on [`JobView`]. Derived values are recomputed on every call, so
//! there is nothing to invalidate when the state changes.

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use jobwatch_interface::{InterfaceError, RpcResponse, Transport};
use jobwatch_protocol::{
    JobMeta, LATEST_RUN, MONITOR_SERVICE, RUNNABLE_SERVICE, RpcCall, STATUS_METHOD,
    TIME_SERIES_METHOD, TimeSeriesLevel,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    context::ViewModelContext,
    format,
    metrics::{MetricTracker, MetricsPoll, PollDescriptor, PollTicket},
    state::{ActionIcon, JobState, UNKNOWN_ACTION},
};

/// Shown instead of a relative time when a job never started or stopped.
pub const NO_DATE: &str = "No Date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobKind {
    Flow,
    Batch,
}

impl JobKind {
    pub fn label(self) -> &'static str {
        match self {
            JobKind::Flow => "Flow",
            JobKind::Batch => "Batch",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            JobKind::Flow => "Flows",
            JobKind::Batch => "Batches",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaEntry {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct JobCore {
    pub(crate) id: String,
    pub(crate) app: String,
    pub(crate) name: String,
    pub(crate) current_state: Option<JobState>,
    pub(crate) metrics: MetricTracker,
    pub(crate) last_started: Option<i64>,
    pub(crate) last_stopped: Option<i64>,
    pub(crate) meta: Option<JobMeta>,
    pub(crate) context: Arc<ViewModelContext>,
    instance: Uuid,
    generation: u64,
}

impl JobCore {
    pub(crate) fn new(
        id: String,
        app: String,
        name: String,
        meta: Option<JobMeta>,
        context: Arc<ViewModelContext>,
    ) -> Self {
        Self {
            id,
            app,
            name,
            current_state: None,
            metrics: MetricTracker::default(),
            last_started: None,
            last_stopped: None,
            meta,
            context,
            instance: Uuid::new_v4(),
            generation: 0,
        }
    }

    pub fn ticket(&self) -> PollTicket {
        PollTicket {
            instance: self.instance,
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: &PollTicket) -> bool {
        *ticket == self.ticket()
    }

    fn cancel(&mut self) {
        self.generation += 1;
        self.metrics.set_loading(false);
    }
}

/// Render-ready summary of a job, one JSON object per line on the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub kind: JobKind,
    pub id: String,
    pub app: String,
    pub href: String,
    pub state: Option<JobState>,
    pub action_icon: ActionIcon,
    pub default_action: &'static str,
    pub stop_disabled: bool,
    pub start_pause_disabled: bool,
    pub started: String,
    pub stopped: String,
    pub loading: bool,
    pub metrics: BTreeMap<String, Vec<f64>>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

fn relative_label(at: Option<i64>, now_ms: i64) -> String {
    match at {
        Some(at) if at >= 0 => format::time_ago(at, now_ms),
        _ => NO_DATE.to_string(),
    }
}

pub trait JobView {
    fn core(&self) -> &JobCore;
    fn core_mut(&mut self) -> &mut JobCore;
    fn kind(&self) -> JobKind;
    /// Client-side navigation path for this job.
    fn href(&self) -> String;
    fn time_series_level(&self) -> TimeSeriesLevel;

    /// Kind-specific fields merged into [`JobView::snapshot`].
    fn snapshot_extras(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    fn id(&self) -> &str {
        &self.core().id
    }

    fn app(&self) -> &str {
        &self.core().app
    }

    fn name(&self) -> &str {
        &self.core().name
    }

    fn current_state(&self) -> Option<&JobState> {
        self.core().current_state.as_ref()
    }

    /// Records a state reported by the gateway. Any value is accepted.
    fn set_current_state(&mut self, state: JobState) {
        self.core_mut().current_state = Some(state);
    }

    fn is_running(&self) -> bool {
        matches!(self.current_state(), Some(JobState::Running))
    }

    fn action_icon(&self) -> ActionIcon {
        match self.current_state() {
            Some(JobState::Running | JobState::Pausing) => ActionIcon::Pause,
            _ => ActionIcon::Start,
        }
    }

    fn stop_disabled(&self) -> bool {
        !self.is_running()
    }

    fn start_pause_disabled(&self) -> bool {
        !matches!(
            self.current_state(),
            Some(JobState::Stopped | JobState::Paused | JobState::Deployed | JobState::Running)
        )
    }

    fn default_action_label(&self) -> &'static str {
        self.current_state()
            .and_then(JobState::default_action)
            .unwrap_or(UNKNOWN_ACTION)
    }

    fn last_started(&self) -> Option<i64> {
        self.core().last_started
    }

    fn last_stopped(&self) -> Option<i64> {
        self.core().last_stopped
    }

    fn set_last_started(&mut self, at: Option<i64>) {
        self.core_mut().last_started = at;
    }

    fn set_last_stopped(&mut self, at: Option<i64>) {
        self.core_mut().last_stopped = at;
    }

    fn relative_started_label(&self, now_ms: i64) -> String {
        relative_label(self.last_started(), now_ms)
    }

    fn relative_stopped_label(&self, now_ms: i64) -> String {
        relative_label(self.last_stopped(), now_ms)
    }

    /// Metadata payload as a key-sorted list, for key/value tables.
    fn meta_entries(&self) -> Vec<MetaEntry> {
        let Some(meta) = &self.core().meta else {
            return Vec::new();
        };
        match serde_json::to_value(meta) {
            Ok(Value::Object(map)) => map
                .into_iter()
                .map(|(key, value)| MetaEntry { key, value })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn metrics(&self) -> &MetricTracker {
        &self.core().metrics
    }

    fn add_metric_name(&mut self, name: &str) {
        self.core_mut().metrics.add_name(name);
    }

    fn build_metrics_poll_request(&mut self) -> MetricsPoll {
        self.metrics_poll(Utc::now().timestamp_millis())
    }

    /// Metrics request for the window ending at `now_ms`.
    ///
    /// Only running jobs are polled. A running job without tracked metrics
    /// yields [`MetricsPoll::NothingTracked`] and clears the loading flag.
    fn metrics_poll(&mut self, now_ms: i64) -> MetricsPoll {
        if !self.is_running() {
            return MetricsPoll::Idle;
        }
        let level = self.time_series_level();
        let core = self.core_mut();
        if core.metrics.is_empty() {
            debug!(
                target: "jobwatch",
                "cannot update, not tracking any metrics for {}:{}", core.app, core.name
            );
            core.metrics.set_loading(false);
            return MetricsPoll::NothingTracked;
        }

        let end = (now_ms as f64 / 1000.0).round() as i64;
        let start = end - core.context.time_range.as_secs() as i64;
        let names: Vec<Value> = core.metrics.names().map(Value::from).collect();

        core.metrics.set_loading(true);
        MetricsPoll::Request(PollDescriptor {
            service: MONITOR_SERVICE,
            call: RpcCall {
                method: TIME_SERIES_METHOD.to_string(),
                params: vec![
                    json!(core.app),
                    json!(core.name),
                    Value::Array(names),
                    json!(start),
                    json!(end),
                    json!(level.as_str()),
                ],
            },
            ticket: core.ticket(),
        })
    }

    /// Applies a metrics reply. Returns `true` when series were stored.
    ///
    /// Stale tickets, replies without `params` and undecodable payloads are
    /// ignored; the next poll will try again.
    fn on_metrics_response(&mut self, ticket: &PollTicket, response: &RpcResponse) -> bool {
        let core = self.core_mut();
        if !core.is_current(ticket) {
            debug!(target: "jobwatch", job = %core.id, "dropping stale metrics reply");
            return false;
        }
        match response.time_series() {
            None => false,
            Some(Ok(params)) => {
                core.metrics.apply_time_series(&params);
                true
            }
            Some(Err(err)) => {
                warn!(target: "jobwatch", job = %core.id, "undecodable metrics reply: {err}");
                false
            }
        }
    }

    fn status_poll(&self) -> PollDescriptor {
        let core = self.core();
        PollDescriptor {
            service: RUNNABLE_SERVICE,
            call: RpcCall {
                method: STATUS_METHOD.to_string(),
                params: vec![json!(core.app), json!(core.name), json!(LATEST_RUN)],
            },
            ticket: core.ticket(),
        }
    }

    /// Applies a status reply. Returns `true` when the state changed.
    ///
    /// Replies without a `result` (including error replies) leave the state
    /// untouched.
    fn apply_status_response(&mut self, ticket: &PollTicket, response: &RpcResponse) -> bool {
        let core = self.core_mut();
        if !core.is_current(ticket) {
            debug!(target: "jobwatch", job = %core.id, "dropping stale status reply");
            return false;
        }
        if let Some(error) = &response.error {
            debug!(target: "jobwatch", job = %core.id, "status rpc error: {error}");
        }
        let Some(status) = response.status() else {
            return false;
        };
        let state = JobState::parse(&status.status);
        if core.current_state.as_ref() == Some(&state) {
            return false;
        }
        core.current_state = Some(state);
        true
    }

    /// Issues one status call and applies its reply.
    fn update_state(&mut self, transport: &dyn Transport) -> Result<bool, InterfaceError> {
        let descriptor = self.status_poll();
        let response = transport.rpc(
            descriptor.service,
            &descriptor.call.method,
            descriptor.call.params,
        )?;
        Ok(self.apply_status_response(&descriptor.ticket, &response))
    }

    /// Invalidates every request issued so far.
    fn cancel_polls(&mut self) {
        self.core_mut().cancel();
    }

    fn snapshot(&self, now_ms: i64) -> JobSnapshot {
        JobSnapshot {
            kind: self.kind(),
            id: self.id().to_string(),
            app: self.app().to_string(),
            href: self.href(),
            state: self.current_state().cloned(),
            action_icon: self.action_icon(),
            default_action: self.default_action_label(),
            stop_disabled: self.stop_disabled(),
            start_pause_disabled: self.start_pause_disabled(),
            started: self.relative_started_label(now_ms),
            stopped: self.relative_stopped_label(now_ms),
            loading: self.metrics().is_loading(),
            metrics: self.metrics().data().clone(),
            extras: self.snapshot_extras(),
        }
    }
}
