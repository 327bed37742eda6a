//! Wire contracts for the job gateway.
//!
//! These types mirror the JSON envelopes the gateway speaks over its RPC
//! and REST surfaces. They are shared between the HTTP client and the
//! view-model layer, and stay deliberately loose: the gateway is allowed
//! to omit any field and the consumers decide what a missing field means.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RPC service answering lifecycle queries.
pub const RUNNABLE_SERVICE: &str = "runnable";
/// Method on [`RUNNABLE_SERVICE`] returning the current job status.
pub const STATUS_METHOD: &str = "status";
/// RPC service answering metric queries.
pub const MONITOR_SERVICE: &str = "monitor";
/// Method on [`MONITOR_SERVICE`] returning time series for a set of metrics.
pub const TIME_SERIES_METHOD: &str = "getTimeSeries";
/// Run id sentinel asking the gateway for the most recent run.
pub const LATEST_RUN: i64 = -1;

/// Generic RPC reply envelope.
///
/// Status calls answer with `result`, metric calls with `params`, and any
/// call may carry an `error` instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcResponse {
    pub fn with_result(result: Value) -> Self {
        Self {
            result: Some(result),
            ..Default::default()
        }
    }

    pub fn with_error(error: Value) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_params(params: Value) -> Self {
        Self {
            params: Some(params),
            ..Default::default()
        }
    }

    /// Decodes `result` as a status payload. `None` when absent or malformed.
    pub fn status(&self) -> Option<StatusResult> {
        self.result
            .as_ref()
            .and_then(|result| serde_json::from_value(result.clone()).ok())
    }

    /// Decodes `params` as a time-series payload. `None` when absent.
    pub fn time_series(&self) -> Option<Result<TimeSeriesParams, serde_json::Error>> {
        self.params
            .as_ref()
            .map(|params| serde_json::from_value(params.clone()))
    }
}

/// Result body of `runnable.status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub status: String,
}

/// Params body of `monitor.getTimeSeries`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesParams {
    #[serde(default)]
    pub points: BTreeMap<String, Vec<MetricPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<Value>,
}

/// One sample in a time series. Anything besides `value` (timestamps and
/// the like) is carried along untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub value: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The call half of a poll descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// Aggregation level requested from the monitor service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSeriesLevel {
    #[serde(rename = "FLOW_LEVEL")]
    Flow,
    #[serde(rename = "MAPREDUCE_LEVEL")]
    Mapreduce,
}

impl TimeSeriesLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeSeriesLevel::Flow => "FLOW_LEVEL",
            TimeSeriesLevel::Mapreduce => "MAPREDUCE_LEVEL",
        }
    }
}

/// Job entry as returned by app listings and `rest(apps, <app>, <kind>, <id>)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<JobMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_started: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_stopped: Option<i64>,
}

/// Opaque job metadata. Only `name`, `app` and `startTime` are interpreted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<EpochMillis>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Epoch milliseconds, sent either as a number or as a numeric string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpochMillis {
    Number(i64),
    Text(String),
}

impl EpochMillis {
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            EpochMillis::Number(value) => Some(*value),
            EpochMillis::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl From<i64> for EpochMillis {
    fn from(value: i64) -> Self {
        EpochMillis::Number(value)
    }
}
