use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use jobwatch_interface::Transport;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{
    batch::{BatchViewModel, split_composite_id},
    context::ViewModelContext,
    flow::FlowViewModel,
    job::{JobKind, JobView},
    poller::{PollHandle, spawn_poller},
    updates::StateUpdate,
};

/// A job requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub kind: JobKind,
    /// `<app>:<job>`
    pub id: String,
    pub metrics: Vec<String>,
}

/// Builds a view-model for `target` and starts polling it.
pub async fn start_target(
    target: &WatchTarget,
    transport: &Arc<dyn Transport>,
    context: &Arc<ViewModelContext>,
    updates: &mpsc::UnboundedSender<StateUpdate>,
) -> Result<PollHandle> {
    let interval = context.poll_interval;
    let handle = match target.kind {
        JobKind::Flow => {
            let (app, flow) = split_composite_id(&target.id)?;
            let mut model = FlowViewModel::from_ids(app, flow, Arc::clone(context));
            for metric in &target.metrics {
                model.add_metric_name(metric);
            }
            spawn_poller(
                Arc::new(Mutex::new(model)),
                Arc::clone(transport),
                interval,
                updates.clone(),
            )
        }
        JobKind::Batch => {
            let mut model =
                BatchViewModel::find(&target.id, Arc::clone(transport), Arc::clone(context))
                    .await
                    .with_context(|| format!("failed to load batch {}", target.id))?;
            for metric in &target.metrics {
                model.add_metric_name(metric);
            }
            spawn_poller(
                Arc::new(Mutex::new(model)),
                Arc::clone(transport),
                interval,
                updates.clone(),
            )
        }
    };
    info!(target: "jobwatch", job = %target.id, kind = target.kind.label(), "watching");
    Ok(handle)
}

/// Polls every target and writes one JSON snapshot per update to `out`
/// until all pollers stop or Ctrl-C is received.
pub async fn watch(
    transport: Arc<dyn Transport>,
    context: Arc<ViewModelContext>,
    targets: Vec<WatchTarget>,
    mut out: impl Write,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut handles = Vec::with_capacity(targets.len());
    for target in &targets {
        handles.push(start_target(target, &transport, &context, &tx).await?);
    }
    drop(tx);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Some(update) => write_update(&mut out, &update)?,
                None => break,
            },
            _ = &mut ctrl_c => {
                info!(target: "jobwatch", "interrupted, stopping pollers");
                handles.iter().for_each(PollHandle::cancel);
                break;
            }
        }
    }

    for result in futures::future::join_all(handles.into_iter().map(PollHandle::join)).await {
        if let Err(err) = result {
            warn!(target: "jobwatch", "poller task failed: {err}");
        }
    }
    Ok(())
}

pub fn write_update(out: &mut impl Write, update: &StateUpdate) -> Result<()> {
    match update {
        StateUpdate::StateChanged(snapshot) | StateUpdate::MetricsUpdated(snapshot) => {
            serde_json::to_writer(&mut *out, snapshot)?;
            writeln!(out)?;
            out.flush()?;
        }
        StateUpdate::PollFailed { .. } => {}
        StateUpdate::Stopped { id } => info!(target: "jobwatch", job = %id, "stopped"),
    }
    Ok(())
}
