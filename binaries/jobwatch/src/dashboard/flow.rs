use std::sync::Arc;

use jobwatch_protocol::{JobResource, TimeSeriesLevel};

use super::{
    context::ViewModelContext,
    error::ViewModelError,
    job::{JobCore, JobKind, JobView},
};

/// View-model of a stream-processing flow.
///
/// A flow is identified by its own name (`flowId`, falling back to
/// `meta.name`) within its application.
#[derive(Debug, Clone)]
pub struct FlowViewModel {
    core: JobCore,
}

impl FlowViewModel {
    pub fn new(
        resource: JobResource,
        context: Arc<ViewModelContext>,
    ) -> Result<Self, ViewModelError> {
        let meta = resource.meta;
        let id = resource
            .flow_id
            .or_else(|| meta.as_ref().and_then(|meta| meta.name.clone()))
            .ok_or(ViewModelError::MissingField("flowId"))?;
        let app = resource
            .application_id
            .or_else(|| meta.as_ref().and_then(|meta| meta.app.clone()))
            .ok_or(ViewModelError::MissingField("applicationId"))?;

        let mut core = JobCore::new(id.clone(), app, id, meta, context);
        core.last_started = resource.last_started;
        core.last_stopped = resource.last_stopped;
        Ok(Self { core })
    }

    pub fn from_ids(
        app: impl Into<String>,
        flow: impl Into<String>,
        context: Arc<ViewModelContext>,
    ) -> Self {
        let flow = flow.into();
        Self {
            core: JobCore::new(flow.clone(), app.into(), flow, None, context),
        }
    }
}

impl JobView for FlowViewModel {
    fn core(&self) -> &JobCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut JobCore {
        &mut self.core
    }

    fn kind(&self) -> JobKind {
        JobKind::Flow
    }

    fn href(&self) -> String {
        format!("/flows/status/{}:{}", self.core.app, self.core.id)
    }

    fn time_series_level(&self) -> TimeSeriesLevel {
        TimeSeriesLevel::Flow
    }
}
