#[cfg(test)]
use crate::dashboard::{
    ActionIcon, BatchViewModel, FlowViewModel, JobKind, JobState, JobView, MetricsPoll, NO_DATE,
    StateUpdate, ViewModelContext, WatchTarget, bridge::ServiceBundle, spawn_poller,
    watch::{start_target, write_update},
};

#[cfg(test)]
use jobwatch_interface::{InterfaceError, MockTransport, RpcResponse, Transport};
#[cfg(test)]
use jobwatch_protocol::{JobMeta, JobResource};
#[cfg(test)]
use serde_json::json;
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
fn context() -> Arc<ViewModelContext> {
    ViewModelContext::new(Duration::from_secs(30), Duration::from_millis(10)).shared()
}

#[cfg(test)]
fn flow_in(state: JobState) -> FlowViewModel {
    let mut flow = FlowViewModel::from_ids("app1", "wordcount", context());
    flow.set_current_state(state);
    flow
}

#[cfg(test)]
mod derived_state_tests {
    use super::*;

    #[test]
    fn action_icon_pauses_only_while_running_or_pausing() {
        for state in JobState::KNOWN {
            let expected = match state {
                JobState::Running | JobState::Pausing => ActionIcon::Pause,
                _ => ActionIcon::Start,
            };
            assert_eq!(flow_in(state.clone()).action_icon(), expected, "{state}");
        }
    }

    #[test]
    fn stop_is_enabled_only_while_running() {
        for state in JobState::KNOWN {
            let running = state == JobState::Running;
            assert_eq!(flow_in(state.clone()).stop_disabled(), !running, "{state}");
        }
    }

    #[test]
    fn start_pause_enabled_set() {
        for state in JobState::KNOWN {
            let enabled = matches!(
                state,
                JobState::Stopped | JobState::Paused | JobState::Deployed | JobState::Running
            );
            assert_eq!(
                flow_in(state.clone()).start_pause_disabled(),
                !enabled,
                "{state}"
            );
        }
    }

    #[test]
    fn metrics_are_only_fetched_for_running_jobs() {
        for state in JobState::KNOWN {
            let mut flow = flow_in(state.clone());
            flow.add_metric_name("process.events");
            let poll = flow.metrics_poll(1_700_000_000_000);
            if state == JobState::Running {
                assert!(poll.descriptor().is_some());
            } else {
                assert_eq!(poll, MetricsPoll::Idle, "{state}");
            }
        }
    }

    #[test]
    fn unset_and_unknown_states_fall_back() {
        let flow = FlowViewModel::from_ids("app1", "wordcount", context());
        assert_eq!(flow.current_state(), None);
        assert_eq!(flow.action_icon(), ActionIcon::Start);
        assert!(flow.stop_disabled());
        assert!(flow.start_pause_disabled());
        assert_eq!(flow.default_action_label(), "Unknown");

        let flow = flow_in(JobState::parse("REBALANCING"));
        assert_eq!(flow.default_action_label(), "Unknown");
        assert!(flow.start_pause_disabled());

        assert_eq!(flow_in(JobState::Running).default_action_label(), "Pause");
        assert_eq!(flow_in(JobState::Adjusting).default_action_label(), "...");
    }

    #[test]
    fn lowercase_status_is_not_running() {
        let mut flow = FlowViewModel::from_ids("app1", "wordcount", context());
        flow.add_metric_name("a.b");
        let ticket = flow.status_poll().ticket;
        let reply = RpcResponse::with_result(json!({"status": "running"}));
        assert!(flow.apply_status_response(&ticket, &reply));

        assert_eq!(flow.current_state(), Some(&JobState::Unknown("running".into())));
        assert!(!flow.is_running());
        assert!(flow.stop_disabled());
        assert_eq!(flow.action_icon(), ActionIcon::Start);
        assert_eq!(flow.metrics_poll(1_700_000_000_000), MetricsPoll::Idle);
        assert_eq!(flow.default_action_label(), "Pause");
        assert_eq!(flow.snapshot(0).state.map(|s| s.to_string()), Some("running".into()));
    }

    #[test]
    fn relative_labels() {
        let now = 1_700_000_000_000;
        let mut flow = flow_in(JobState::Stopped);
        assert_eq!(flow.relative_started_label(now), NO_DATE);
        assert_eq!(flow.relative_stopped_label(now), NO_DATE);

        flow.set_last_started(Some(now - 5 * 60 * 1000));
        flow.set_last_stopped(Some(-1));
        assert_eq!(flow.relative_started_label(now), "5 minutes ago");
        assert_eq!(flow.relative_stopped_label(now), NO_DATE);
    }

    #[test]
    fn job_kinds_name_themselves() {
        assert_eq!(JobKind::Flow.label(), "Flow");
        assert_eq!(JobKind::Batch.plural(), "Batches");
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn replies_for_cancelled_polls_are_dropped() {
        let mut flow = flow_in(JobState::Running);
        flow.add_metric_name("a.b");
        let stale = flow.metrics_poll(0).into_descriptor().unwrap();
        flow.cancel_polls();
        assert!(!flow.metrics().is_loading());

        let reply = RpcResponse::with_params(json!({"points": {"a.b": [{"value": 1}]}}));
        assert!(!flow.on_metrics_response(&stale.ticket, &reply));
        assert!(flow.metrics().data().is_empty());

        let fresh = flow.metrics_poll(0).into_descriptor().unwrap();
        assert_ne!(fresh.ticket, stale.ticket);
        assert!(flow.on_metrics_response(&fresh.ticket, &reply));
        assert_eq!(flow.metrics().series("ab"), Some(&[1.0][..]));
    }

    #[test]
    fn replies_from_another_instance_are_dropped() {
        let mut first = flow_in(JobState::Running);
        let mut second = flow_in(JobState::Running);
        first.add_metric_name("a");
        second.add_metric_name("a");
        let ticket = first.metrics_poll(0).into_descriptor().unwrap().ticket;

        let reply = RpcResponse::with_params(json!({"points": {"a": [{"value": 4}]}}));
        assert!(!second.on_metrics_response(&ticket, &reply));
        assert!(first.on_metrics_response(&ticket, &reply));
    }

    #[test]
    fn replies_without_params_are_ignored() {
        let mut flow = flow_in(JobState::Running);
        flow.add_metric_name("a.b");
        let descriptor = flow.metrics_poll(0).into_descriptor().unwrap();

        assert!(!flow.on_metrics_response(&descriptor.ticket, &RpcResponse::default()));
        assert!(flow.metrics().data().is_empty());
        assert!(flow.metrics().is_loading());
    }

    #[test]
    fn status_error_reply_keeps_state() {
        let mut flow = flow_in(JobState::Running);
        let descriptor = flow.status_poll();
        assert_eq!(
            descriptor.call.params,
            vec![json!("app1"), json!("wordcount"), json!(-1)]
        );

        let reply = RpcResponse::with_error(json!("gateway unavailable"));
        assert!(!flow.apply_status_response(&descriptor.ticket, &reply));
        assert_eq!(flow.current_state(), Some(&JobState::Running));
    }

    #[test]
    fn meta_entries_are_sorted_key_values() {
        let resource = JobResource {
            application_id: Some("app1".into()),
            id: Some("mr1".into()),
            meta: Some(JobMeta {
                name: Some("mr1".into()),
                extra: [("owner".to_string(), json!("ops"))].into_iter().collect(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let batch = BatchViewModel::new(resource, context()).unwrap();
        let keys: Vec<_> = batch
            .meta_entries()
            .into_iter()
            .map(|entry| entry.key)
            .collect();
        assert_eq!(keys, vec!["name", "owner"]);
        assert!(FlowViewModel::from_ids("a", "b", context()).meta_entries().is_empty());
    }

    #[test]
    fn snapshot_serializes_for_rendering() {
        let mut flow = flow_in(JobState::Running);
        flow.add_metric_name("a.b");
        let descriptor = flow.metrics_poll(0).into_descriptor().unwrap();
        flow.on_metrics_response(
            &descriptor.ticket,
            &RpcResponse::with_params(json!({"points": {"a.b": [{"value": 2}]}})),
        );

        let value = serde_json::to_value(flow.snapshot(0)).unwrap();
        assert_eq!(value["kind"], "Flow");
        assert_eq!(value["id"], "wordcount");
        assert_eq!(value["href"], "/flows/status/app1:wordcount");
        assert_eq!(value["state"], "RUNNING");
        assert_eq!(value["actionIcon"], "pause-icon");
        assert_eq!(value["defaultAction"], "Pause");
        assert_eq!(value["stopDisabled"], false);
        assert_eq!(value["started"], NO_DATE);
        assert_eq!(value["metrics"]["ab"], json!([2.0]));
    }

    #[test]
    fn updates_expose_job_and_snapshot() {
        let flow = flow_in(JobState::Running);
        let changed = StateUpdate::StateChanged(flow.snapshot(0));
        assert_eq!(changed.job_id(), "wordcount");
        assert_eq!(changed.snapshot().map(|s| s.kind), Some(JobKind::Flow));

        let stopped = StateUpdate::Stopped {
            id: "wordcount".into(),
        };
        assert_eq!(stopped.job_id(), "wordcount");
        assert!(stopped.snapshot().is_none());
    }

    #[test]
    fn write_update_emits_one_json_line_per_snapshot() {
        let flow = flow_in(JobState::Stopped);
        let mut out = Vec::new();
        write_update(&mut out, &StateUpdate::StateChanged(flow.snapshot(0))).unwrap();
        write_update(
            &mut out,
            &StateUpdate::PollFailed {
                id: "wordcount".into(),
                reason: "timeout".into(),
            },
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["state"], "STOPPED");
        assert_eq!(value["defaultAction"], "Start");
    }
}

#[cfg(test)]
mod poller_tests {
    use super::*;
    use tokio::{sync::mpsc, time::timeout};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    async fn next_update(rx: &mut mpsc::UnboundedReceiver<StateUpdate>) -> StateUpdate {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("update in time")
            .expect("channel open")
    }

    #[test]
    fn poller_reports_state_then_metrics() {
        let transport = Arc::new(MockTransport::new());
        transport.push_rpc_result(
            "runnable",
            "status",
            Ok(RpcResponse::with_result(json!({"status": "RUNNING"}))),
        );
        transport.push_rpc_result(
            "monitor",
            "getTimeSeries",
            Ok(RpcResponse::with_params(
                json!({"points": {"process.events": [{"value": 5}, {"value": 7}]}}),
            )),
        );

        let mut flow = FlowViewModel::from_ids("app1", "wordcount", context());
        flow.add_metric_name("process.events");
        let view = Arc::new(Mutex::new(flow));
        let transport_dyn: Arc<dyn Transport> = transport.clone();

        runtime().block_on(async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let handle = spawn_poller(view.clone(), transport_dyn, Duration::from_millis(10), tx);

            match next_update(&mut rx).await {
                StateUpdate::StateChanged(snapshot) => {
                    assert_eq!(snapshot.state, Some(JobState::Running))
                }
                other => panic!("unexpected update: {other:?}"),
            }
            match next_update(&mut rx).await {
                StateUpdate::MetricsUpdated(snapshot) => {
                    assert_eq!(snapshot.metrics["processevents"], vec![5.0, 7.0])
                }
                other => panic!("unexpected update: {other:?}"),
            }

            handle.cancel();
            loop {
                if let StateUpdate::Stopped { id } = next_update(&mut rx).await {
                    assert_eq!(id, "wordcount");
                    break;
                }
            }
            handle.join().await.unwrap();
        });

        let polls_after_stop = transport.rpc_call_count("runnable", "status");
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(transport.rpc_call_count("runnable", "status"), polls_after_stop);
        assert!(!view.lock().unwrap().metrics().is_loading());
    }

    #[test]
    fn poller_reports_transport_failures_and_keeps_going() {
        let transport = Arc::new(MockTransport::new());
        transport.push_rpc_result(
            "runnable",
            "status",
            Err(InterfaceError::Message("connection refused".into())),
        );
        transport.push_rpc_result(
            "runnable",
            "status",
            Ok(RpcResponse::with_result(json!({"status": "STOPPED"}))),
        );
        let view = Arc::new(Mutex::new(FlowViewModel::from_ids("app1", "wordcount", context())));

        runtime().block_on(async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let handle = spawn_poller(
                view.clone(),
                transport.clone() as Arc<dyn Transport>,
                Duration::from_millis(10),
                tx,
            );

            match next_update(&mut rx).await {
                StateUpdate::PollFailed { id, reason } => {
                    assert_eq!(id, "wordcount");
                    assert!(reason.contains("connection refused"));
                }
                other => panic!("unexpected update: {other:?}"),
            }
            match next_update(&mut rx).await {
                StateUpdate::StateChanged(snapshot) => {
                    assert_eq!(snapshot.state, Some(JobState::Stopped))
                }
                other => panic!("unexpected update: {other:?}"),
            }
            handle.cancel();
            handle.join().await.unwrap();
        });

        assert_eq!(transport.rpc_call_count("monitor", "getTimeSeries"), 0);
    }

    #[test]
    fn batch_target_is_loaded_then_polled() {
        let transport = Arc::new(MockTransport::new());
        transport.push_rest_result(
            &["apps", "app1", "mapreduce", "mr1"],
            Ok(json!({"applicationId": "app1", "id": "mr1"})),
        );
        transport.push_rpc_result(
            "runnable",
            "status",
            Ok(RpcResponse::with_result(json!({"status": "STOPPED"}))),
        );
        transport.push_rpc_result(
            "runnable",
            "status",
            Ok(RpcResponse::with_result(json!({"status": "RUNNING"}))),
        );
        let bundle = ServiceBundle::with_transport(transport.clone());
        let target = WatchTarget {
            kind: JobKind::Batch,
            id: "app1:mr1".into(),
            metrics: vec!["tasks.completed".into()],
        };

        let lines = runtime().block_on(async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let handle = start_target(&target, &bundle.transport, &context(), &tx)
                .await
                .unwrap();
            drop(tx);
            match next_update(&mut rx).await {
                StateUpdate::StateChanged(snapshot) => {
                    assert_eq!(snapshot.id, "app1:mr1");
                    assert_eq!(snapshot.href, "/batches/app1:mr1");
                    assert_eq!(snapshot.state, Some(JobState::Running));
                }
                other => panic!("unexpected update: {other:?}"),
            }
            handle.cancel();
            handle.join().await.unwrap();
            let mut rest = Vec::new();
            while let Some(update) = rx.recv().await {
                rest.push(update);
            }
            rest
        });
        assert!(matches!(lines.last(), Some(StateUpdate::Stopped { .. })));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let transport = Arc::new(MockTransport::new());
        transport.push_rpc_result(
            "runnable",
            "status",
            Ok(RpcResponse::with_result(json!({"status": "STOPPED"}))),
        );
        let view = Arc::new(Mutex::new(FlowViewModel::from_ids("app1", "wordcount", context())));

        runtime().block_on(async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let handle = spawn_poller(
                view.clone(),
                transport.clone() as Arc<dyn Transport>,
                Duration::ZERO,
                tx,
            );
            assert!(matches!(
                next_update(&mut rx).await,
                StateUpdate::StateChanged(_)
            ));
            handle.cancel();
            handle.join().await.unwrap();
        });
    }

    #[test]
    fn flow_targets_with_extra_colons_are_rejected() {
        let bundle = ServiceBundle::with_transport(Arc::new(MockTransport::new()));
        let target = WatchTarget {
            kind: JobKind::Flow,
            id: "app1:wordcount:extra".into(),
            metrics: Vec::new(),
        };
        runtime().block_on(async {
            let (tx, _rx) = mpsc::unbounded_channel();
            let err = start_target(&target, &bundle.transport, &context(), &tx)
                .await
                .err()
                .expect("invalid id");
            assert!(err.to_string().contains("app1:wordcount:extra"));
        });
    }

    #[test]
    fn dropping_the_handle_stops_the_poller() {
        let transport = Arc::new(MockTransport::new());
        transport.push_rpc_result(
            "runnable",
            "status",
            Ok(RpcResponse::with_result(json!({"status": "DEPLOYED"}))),
        );
        let view = Arc::new(Mutex::new(FlowViewModel::from_ids("app1", "wordcount", context())));

        runtime().block_on(async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let handle = spawn_poller(
                view.clone(),
                transport.clone() as Arc<dyn Transport>,
                Duration::from_millis(10),
                tx,
            );
            drop(handle);
            loop {
                if let StateUpdate::Stopped { .. } = next_update(&mut rx).await {
                    break;
                }
            }
        });
    }
}
