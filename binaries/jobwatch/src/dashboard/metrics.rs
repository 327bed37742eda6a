use std::collections::{BTreeMap, BTreeSet};

use jobwatch_protocol::{RpcCall, TimeSeriesParams};
use serde::Serialize;
use uuid::Uuid;

/// Identifies the view-model instance and poll generation a request was
/// issued for. Replies carrying an outdated ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PollTicket {
    pub instance: Uuid,
    pub generation: u64,
}

/// A remote call for the poller to run, plus the ticket to hand back with
/// the reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PollDescriptor {
    pub service: &'static str,
    pub call: RpcCall,
    pub ticket: PollTicket,
}

/// Outcome of asking a view-model for its metrics request.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsPoll {
    /// The job is not running; nothing is fetched.
    Idle,
    /// The job is running but no metric names are tracked.
    NothingTracked,
    Request(PollDescriptor),
}

impl MetricsPoll {
    pub fn descriptor(&self) -> Option<&PollDescriptor> {
        match self {
            MetricsPoll::Request(descriptor) => Some(descriptor),
            MetricsPoll::Idle | MetricsPoll::NothingTracked => None,
        }
    }

    pub fn into_descriptor(self) -> Option<PollDescriptor> {
        match self {
            MetricsPoll::Request(descriptor) => Some(descriptor),
            MetricsPoll::Idle | MetricsPoll::NothingTracked => None,
        }
    }
}

/// Metric keys are stored without dots so they can be used as field names.
pub fn strip_dots(name: &str) -> String {
    name.chars().filter(|c| *c != '.').collect()
}

/// Tracked metric names and the latest series fetched for them.
#[derive(Debug, Clone, Default)]
pub struct MetricTracker {
    names: BTreeSet<String>,
    data: BTreeMap<String, Vec<f64>>,
    loading: bool,
}

impl MetricTracker {
    /// Returns `false` when `name` was already tracked.
    pub fn add_name(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Series keyed by dot-stripped metric name.
    pub fn data(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.data
    }

    pub fn series(&self, key: &str) -> Option<&[f64]> {
        self.data.get(key).map(Vec::as_slice)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Stores the sample values of every series in `params`, dropping the
    /// sample metadata. Returns how many series were written.
    pub fn apply_time_series(&mut self, params: &TimeSeriesParams) -> usize {
        for (metric, points) in &params.points {
            let values = points.iter().map(|point| point.value).collect();
            self.data.insert(strip_dots(metric), values);
        }
        self.loading = false;
        params.points.len()
    }
}
