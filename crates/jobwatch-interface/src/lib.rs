//! Service traits shared by the jobwatch view-models and transport clients.
//!
//! The view-model layer only ever talks to the gateway through
//! [`Transport`]; concrete clients live in `jobwatch-protocol-client`.

use serde_json::Value;
use thiserror::Error;

pub use jobwatch_protocol::RpcResponse;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    #[error("{0}")]
    Message(String),
}

impl From<String> for InterfaceError {
    fn from(value: String) -> Self {
        InterfaceError::Message(value)
    }
}

impl From<&str> for InterfaceError {
    fn from(value: &str) -> Self {
        InterfaceError::Message(value.to_string())
    }
}

/// RPC/REST client for the job gateway.
///
/// Calls are blocking. Callers running on an async runtime are expected
/// to move them onto a blocking thread.
pub trait Transport: Send + Sync {
    /// Invokes `service.method(params)` and returns the raw reply envelope.
    ///
    /// An `Ok` reply may still carry an `error` field; only transport and
    /// decoding failures surface as `Err`.
    fn rpc(
        &self,
        service: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<RpcResponse, InterfaceError>;

    /// Fetches the REST resource addressed by `segments`, e.g.
    /// `["apps", "app1", "mapreduce", "mr1"]`.
    fn rest(&self, segments: &[&str]) -> Result<Value, InterfaceError>;
}

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use std::{
        collections::{HashMap, VecDeque},
        sync::Mutex,
    };

    use serde_json::Value;

    use super::{InterfaceError, RpcResponse, Transport};

    /// A call observed by [`MockTransport`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum TransportCall {
        Rpc {
            service: String,
            method: String,
            params: Vec<Value>,
        },
        Rest {
            segments: Vec<String>,
        },
    }

    type RpcKey = (String, String);

    /// Canned-response transport.
    ///
    /// Results queued for the same call are returned in order; the last one
    /// keeps being returned once the queue is down to a single entry.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        rpc_results: Mutex<HashMap<RpcKey, VecDeque<Result<RpcResponse, InterfaceError>>>>,
        rest_results: Mutex<HashMap<String, VecDeque<Result<Value, InterfaceError>>>>,
        calls: Mutex<Vec<TransportCall>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_rpc_result(
            &self,
            service: &str,
            method: &str,
            result: Result<RpcResponse, InterfaceError>,
        ) {
            self.rpc_results
                .lock()
                .unwrap()
                .entry((service.to_string(), method.to_string()))
                .or_default()
                .push_back(result);
        }

        pub fn push_rest_result(&self, segments: &[&str], result: Result<Value, InterfaceError>) {
            self.rest_results
                .lock()
                .unwrap()
                .entry(segments.join("/"))
                .or_default()
                .push_back(result);
        }

        pub fn calls(&self) -> Vec<TransportCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn rpc_call_count(&self, service: &str, method: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|call| {
                    matches!(call, TransportCall::Rpc { service: s, method: m, .. }
                        if s == service && m == method)
                })
                .count()
        }
    }

    fn next_result<T: Clone>(
        queue: Option<&mut VecDeque<Result<T, InterfaceError>>>,
        what: &str,
    ) -> Result<T, InterfaceError> {
        let missing = || Err(InterfaceError::Message(format!("no canned result for {what}")));
        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(missing),
            Some(queue) => queue.front().cloned().unwrap_or_else(missing),
            None => missing(),
        }
    }

    impl Transport for MockTransport {
        fn rpc(
            &self,
            service: &str,
            method: &str,
            params: Vec<Value>,
        ) -> Result<RpcResponse, InterfaceError> {
            self.calls.lock().unwrap().push(TransportCall::Rpc {
                service: service.to_string(),
                method: method.to_string(),
                params,
            });
            let mut results = self.rpc_results.lock().unwrap();
            let key = (service.to_string(), method.to_string());
            next_result(results.get_mut(&key), &format!("{service}.{method}"))
        }

        fn rest(&self, segments: &[&str]) -> Result<Value, InterfaceError> {
            self.calls.lock().unwrap().push(TransportCall::Rest {
                segments: segments.iter().map(|s| s.to_string()).collect(),
            });
            let path = segments.join("/");
            let mut results = self.rest_results.lock().unwrap();
            next_result(results.get_mut(&path), &path)
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockTransport, TransportCall};
