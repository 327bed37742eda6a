use std::{collections::BTreeMap, sync::Arc};

use jobwatch_interface::Transport;
use jobwatch_protocol::{
    JobResource, LATEST_RUN, RUNNABLE_SERVICE, STATUS_METHOD, TimeSeriesLevel,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{
    context::ViewModelContext,
    error::{FindError, ViewModelError},
    format,
    job::{JobCore, JobKind, JobView},
    state::JobState,
};

/// Registry a tracked batch metric is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricGroup {
    Timeseries,
    Aggregates,
}

/// A formatted metric value and its unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricDisplay {
    pub value: String,
    pub units: String,
}

/// View-model of a batch (MapReduce) job.
///
/// The id is always `<app>:<name>`.
#[derive(Debug, Clone)]
pub struct BatchViewModel {
    core: JobCore,
    start_time: Option<i64>,
    alert_count: u32,
    timeseries: BTreeMap<String, String>,
    aggregates: BTreeMap<String, String>,
    displays: BTreeMap<String, MetricDisplay>,
}

impl BatchViewModel {
    pub fn new(
        resource: JobResource,
        context: Arc<ViewModelContext>,
    ) -> Result<Self, ViewModelError> {
        let meta = resource.meta;
        let name = resource
            .flow_id
            .or(resource.id)
            .or_else(|| meta.as_ref().and_then(|meta| meta.name.clone()))
            .ok_or(ViewModelError::MissingField("id"))?;
        let app = resource
            .application_id
            .or(resource.application)
            .ok_or(ViewModelError::MissingField("applicationId"))?;
        let start_time = meta
            .as_ref()
            .and_then(|meta| meta.start_time.as_ref())
            .and_then(|start| start.as_millis());

        let mut core = JobCore::new(format!("{app}:{name}"), app, name, meta, context);
        core.last_started = resource.last_started;
        core.last_stopped = resource.last_stopped;
        Ok(Self {
            core,
            start_time,
            alert_count: 0,
            timeseries: BTreeMap::new(),
            aggregates: BTreeMap::new(),
            displays: BTreeMap::new(),
        })
    }

    /// Loads `<app>:<mapreduce>` from the gateway and resolves its current
    /// state. Fails with the RPC's own error payload when the status call
    /// reports one.
    pub async fn find(
        composite_id: &str,
        transport: Arc<dyn Transport>,
        context: Arc<ViewModelContext>,
    ) -> Result<Self, FindError> {
        let (app, job) = split_composite_id(composite_id)?;
        tokio::task::spawn_blocking(move || {
            Self::find_blocking(&app, &job, transport.as_ref(), context)
        })
        .await?
    }

    /// Blocking body of [`BatchViewModel::find`].
    pub fn find_blocking(
        app: &str,
        job: &str,
        transport: &dyn Transport,
        context: Arc<ViewModelContext>,
    ) -> Result<Self, FindError> {
        let payload = transport.rest(&["apps", app, "mapreduce", job])?;
        let mut resource: JobResource = if payload.is_null() {
            JobResource::default()
        } else {
            serde_json::from_value(payload)?
        };
        if resource.application_id.is_none() && resource.application.is_none() {
            resource.application_id = Some(app.to_string());
        }
        let has_name = resource.flow_id.is_some()
            || resource.id.is_some()
            || resource.meta.as_ref().is_some_and(|meta| meta.name.is_some());
        if !has_name {
            resource.id = Some(job.to_string());
        }
        let mut model = Self::new(resource, context)?;

        let response = transport.rpc(
            RUNNABLE_SERVICE,
            STATUS_METHOD,
            vec![json!(app), json!(job), json!(LATEST_RUN)],
        )?;
        if let Some(error) = response.error {
            return Err(FindError::Rpc(error));
        }
        let status = response.status().ok_or(FindError::MissingStatus)?;
        model.set_current_state(JobState::parse(&status.status));
        debug!(target: "jobwatch", job = %model.core.id, state = %status.status, "batch loaded");
        Ok(model)
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    /// Start day as `MMM d, yyyy`.
    pub fn start_date(&self) -> Option<String> {
        self.start_time.and_then(format::calendar_date)
    }

    /// Start time of day as `hh:mm AM`.
    pub fn start_hours(&self) -> Option<String> {
        self.start_time.and_then(format::clock_time)
    }

    pub fn alert_count(&self) -> u32 {
        self.alert_count
    }

    pub fn set_alert_count(&mut self, count: u32) {
        self.alert_count = count;
    }

    /// Resolves `{parent}` and `{id}` in `template` against this job,
    /// files the result under `group` with `label`, and returns it.
    pub fn track_metric(&mut self, template: &str, group: MetricGroup, label: &str) -> String {
        let name = template
            .replacen("{parent}", &self.core.app, 1)
            .replacen("{id}", &self.core.name, 1);
        self.group_mut(group).insert(name.clone(), label.to_string());
        name
    }

    pub fn tracked(&self, group: MetricGroup) -> &BTreeMap<String, String> {
        match group {
            MetricGroup::Timeseries => &self.timeseries,
            MetricGroup::Aggregates => &self.aggregates,
        }
    }

    fn group_mut(&mut self, group: MetricGroup) -> &mut BTreeMap<String, String> {
        match group {
            MetricGroup::Timeseries => &mut self.timeseries,
            MetricGroup::Aggregates => &mut self.aggregates,
        }
    }

    /// Formats `raw` with the unit registered for `label` and stores it.
    pub fn set_metric(&mut self, label: &str, raw: f64) -> &MetricDisplay {
        let (value, units) = self.core.context.units.kind_for(label).format(raw);
        self.displays
            .insert(label.to_string(), MetricDisplay { value, units });
        &self.displays[label]
    }

    pub fn metric_display(&self, label: &str) -> Option<&MetricDisplay> {
        self.displays.get(label)
    }

    /// Formatted metrics as `<label>Label` / `<label>Units` fields.
    pub fn display_fields(&self) -> BTreeMap<String, String> {
        self.displays
            .iter()
            .flat_map(|(label, display)| {
                [
                    (format!("{label}Label"), display.value.clone()),
                    (format!("{label}Units"), display.units.clone()),
                ]
            })
            .collect()
    }
}

/// Splits `<app>:<job>`. Both halves must be non-empty and contain no
/// further `:`.
pub fn split_composite_id(composite_id: &str) -> Result<(String, String), FindError> {
    match composite_id.split_once(':') {
        Some((app, job)) if !app.is_empty() && !job.is_empty() && !job.contains(':') => {
            Ok((app.to_string(), job.to_string()))
        }
        _ => Err(FindError::InvalidId(composite_id.to_string())),
    }
}

impl JobView for BatchViewModel {
    fn core(&self) -> &JobCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut JobCore {
        &mut self.core
    }

    fn kind(&self) -> JobKind {
        JobKind::Batch
    }

    fn href(&self) -> String {
        format!("/batches/{}", self.core.id)
    }

    fn time_series_level(&self) -> TimeSeriesLevel {
        TimeSeriesLevel::Mapreduce
    }

    fn snapshot_extras(&self) -> BTreeMap<String, Value> {
        let mut extras: BTreeMap<String, Value> = self
            .display_fields()
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        extras.insert("alertCount".into(), json!(self.alert_count));
        if let Some(date) = self.start_date() {
            extras.insert("startDate".into(), Value::String(date));
        }
        if let Some(hours) = self.start_hours() {
            extras.insert("startHours".into(), Value::String(hours));
        }
        extras
    }
}
