use std::sync::Arc;

use anyhow::Result;
use jobwatch_interface::Transport;

#[cfg(feature = "protocol")]
use anyhow::Context;
#[cfg(feature = "protocol")]
use jobwatch_protocol_client::ProtocolClients;
#[cfg(feature = "protocol")]
use tracing::info;

use super::config::WatchConfig;

pub struct ServiceBundle {
    pub transport: Arc<dyn Transport>,
}

impl ServiceBundle {
    /// Bundle around an already-built transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[cfg(feature = "protocol")]
pub fn default_service_bundle(config: &WatchConfig) -> Result<ServiceBundle> {
    let clients = ProtocolClients::new(&config.protocol_url).with_context(|| {
        format!(
            "failed to initialize protocol clients for {}",
            config.protocol_url
        )
    })?;
    info!(target: "jobwatch", gateway = %clients.base_url(), "using job gateway");

    Ok(ServiceBundle::with_transport(clients.transport()))
}

#[cfg(not(feature = "protocol"))]
pub fn default_service_bundle(config: &WatchConfig) -> Result<ServiceBundle> {
    anyhow::bail!(
        "jobwatch was built without the `protocol` feature; cannot reach {}",
        config.protocol_url
    )
}
