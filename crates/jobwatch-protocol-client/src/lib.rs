mod error;

use std::sync::Arc;

use jobwatch_interface::{InterfaceError, Transport};
use jobwatch_protocol::RpcResponse;
use reqwest::blocking::{Client, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use url::Url;

pub use error::ProtocolClientError;

#[derive(Clone)]
pub struct ProtocolClients {
    gateway: Arc<Gateway>,
}

impl ProtocolClients {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ProtocolClientError> {
        let base = normalize_base_url(base_url.as_ref())?;
        let client = Client::builder().no_proxy().build()?;
        Ok(Self {
            gateway: Arc::new(Gateway { client, base }),
        })
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(ProtocolTransport {
            gateway: Arc::clone(&self.gateway),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.gateway.base
    }
}

struct Gateway {
    client: Client,
    base: Url,
}

impl Gateway {
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProtocolClientError> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| segment.is_empty() || segment.contains('/'))
        {
            return Err(ProtocolClientError::InvalidSegment(bad.to_string()));
        }
        Ok(self.base.join(&segments.join("/"))?)
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ProtocolClientError> {
        let url = self.endpoint(segments)?;
        debug!(target: "jobwatch", %url, "GET");
        read_json(self.client.get(url).send()?)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ProtocolClientError> {
        let url = self.endpoint(segments)?;
        debug!(target: "jobwatch", %url, "POST");
        read_json(self.client.post(url).json(body).send()?)
    }
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProtocolClientError> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text()?;
    if !status.is_success() {
        return Err(ProtocolClientError::Gateway { status, url, body });
    }
    Ok(serde_json::from_str(&body)?)
}

fn normalize_base_url(raw: &str) -> Result<Url, ProtocolClientError> {
    let mut parsed = Url::parse(raw)?;
    if !parsed.path().ends_with('/') {
        let mut path = parsed.path().to_owned();
        path.push('/');
        parsed.set_path(&path);
    }
    Ok(parsed)
}

/// `Transport` backed by the gateway's HTTP surface:
/// `POST rpc/{service}/{method}` with the params array as body, and
/// `GET rest/{segments..}`.
#[derive(Clone)]
struct ProtocolTransport {
    gateway: Arc<Gateway>,
}

impl Transport for ProtocolTransport {
    fn rpc(
        &self,
        service: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<RpcResponse, InterfaceError> {
        self.gateway
            .post(&["rpc", service, method], &params)
            .map_err(InterfaceError::from_proto_error)
    }

    fn rest(&self, segments: &[&str]) -> Result<Value, InterfaceError> {
        let mut path = Vec::with_capacity(segments.len() + 1);
        path.push("rest");
        path.extend_from_slice(segments);
        self.gateway
            .get(&path)
            .map_err(InterfaceError::from_proto_error)
    }
}

trait InterfaceErrorExt {
    fn from_proto_error(err: ProtocolClientError) -> InterfaceError;
}

impl InterfaceErrorExt for InterfaceError {
    fn from_proto_error(err: ProtocolClientError) -> InterfaceError {
        InterfaceError::Message(err.to_string())
    }
}
