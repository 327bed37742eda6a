//! Periodic status and metrics polling for one view-model.
//!
//! Every tick issues a status call followed, for running jobs, by a metrics
//! call. Transport calls run on the blocking pool and the view-model lock is
//! only taken to build a request or apply a reply, never across I/O.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use jobwatch_interface::{InterfaceError, RpcResponse, Transport};
use tokio::{
    sync::{mpsc::UnboundedSender, watch},
    task::{JoinError, JoinHandle},
    time::MissedTickBehavior,
};
use tokio_stream::{StreamExt, wrappers::IntervalStream};
use tracing::{debug, warn};

use super::{
    config::MIN_POLL_INTERVAL, job::JobView, metrics::PollDescriptor, updates::StateUpdate,
};

/// Handle to a running poller. Dropping it stops the poller as well.
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stops polling. Replies still in flight are discarded.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub async fn join(self) -> Result<(), JoinError> {
        let PollHandle { cancel, task } = self;
        let result = task.await;
        drop(cancel);
        result
    }
}

fn with_view<V, R>(view: &Mutex<V>, f: impl FnOnce(&mut V) -> R) -> Option<R> {
    match view.lock() {
        Ok(mut guard) => Some(f(&mut guard)),
        Err(_) => {
            warn!(target: "jobwatch", "view-model lock poisoned, skipping poll");
            None
        }
    }
}

/// Polls `view` every `interval`, never faster than [`MIN_POLL_INTERVAL`].
pub fn spawn_poller<V>(
    view: Arc<Mutex<V>>,
    transport: Arc<dyn Transport>,
    interval: Duration,
    updates: UnboundedSender<StateUpdate>,
) -> PollHandle
where
    V: JobView + Send + 'static,
{
    let (cancel, mut cancelled) = watch::channel(false);
    let task = tokio::spawn(async move {
        let id = with_view(&view, |view| view.id().to_string()).unwrap_or_default();
        let mut ticker = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(ticker);

        loop {
            tokio::select! {
                biased;
                _ = cancelled.changed() => break,
                tick = ticks.next() => if tick.is_none() { break },
            }
            tokio::select! {
                biased;
                _ = cancelled.changed() => break,
                _ = poll_once(&view, &transport, &updates) => {}
            }
        }

        with_view(&view, |view| view.cancel_polls());
        debug!(target: "jobwatch", job = %id, "poller stopped");
        let _ = updates.send(StateUpdate::Stopped { id });
    });

    PollHandle { cancel, task }
}

/// One status + metrics round.
pub async fn poll_once<V>(
    view: &Arc<Mutex<V>>,
    transport: &Arc<dyn Transport>,
    updates: &UnboundedSender<StateUpdate>,
) where
    V: JobView + Send + 'static,
{
    let Some((id, status)) = with_view(view, |view| (view.id().to_string(), view.status_poll()))
    else {
        return;
    };

    match call(transport, &status).await {
        Ok(response) => {
            let changed = with_view(view, |view| {
                view.apply_status_response(&status.ticket, &response)
                    .then(|| view.snapshot(Utc::now().timestamp_millis()))
            })
            .flatten();
            if let Some(snapshot) = changed {
                let _ = updates.send(StateUpdate::StateChanged(snapshot));
            }
        }
        Err(err) => {
            report_failure(updates, &id, "status", err);
            return;
        }
    }

    let Some(descriptor) =
        with_view(view, |view| view.build_metrics_poll_request().into_descriptor()).flatten()
    else {
        return;
    };

    match call(transport, &descriptor).await {
        Ok(response) => {
            let updated = with_view(view, |view| {
                view.on_metrics_response(&descriptor.ticket, &response)
                    .then(|| view.snapshot(Utc::now().timestamp_millis()))
            })
            .flatten();
            if let Some(snapshot) = updated {
                let _ = updates.send(StateUpdate::MetricsUpdated(snapshot));
            }
        }
        Err(err) => report_failure(updates, &id, "metrics", err),
    }
}

fn report_failure(
    updates: &UnboundedSender<StateUpdate>,
    id: &str,
    what: &str,
    err: InterfaceError,
) {
    warn!(target: "jobwatch", job = %id, "{what} poll failed: {err}");
    let _ = updates.send(StateUpdate::PollFailed {
        id: id.to_string(),
        reason: err.to_string(),
    });
}

async fn call(
    transport: &Arc<dyn Transport>,
    descriptor: &PollDescriptor,
) -> Result<RpcResponse, InterfaceError> {
    let transport = Arc::clone(transport);
    let service = descriptor.service;
    let call = descriptor.call.clone();
    tokio::task::spawn_blocking(move || transport.rpc(service, &call.method, call.params))
        .await
        .map_err(|err| InterfaceError::Message(format!("poll task failed: {err}")))?
}
