use super::job::JobSnapshot;

/// Notifications sent by a poller to whoever renders the jobs.
#[derive(Debug, Clone)]
pub enum StateUpdate {
    StateChanged(JobSnapshot),
    MetricsUpdated(JobSnapshot),
    PollFailed { id: String, reason: String },
    Stopped { id: String },
}

impl StateUpdate {
    pub fn job_id(&self) -> &str {
        match self {
            StateUpdate::StateChanged(snapshot) | StateUpdate::MetricsUpdated(snapshot) => {
                &snapshot.id
            }
            StateUpdate::PollFailed { id, .. } | StateUpdate::Stopped { id } => id,
        }
    }

    pub fn snapshot(&self) -> Option<&JobSnapshot> {
        match self {
            StateUpdate::StateChanged(snapshot) | StateUpdate::MetricsUpdated(snapshot) => {
                Some(snapshot)
            }
            StateUpdate::PollFailed { .. } | StateUpdate::Stopped { .. } => None,
        }
    }
}
