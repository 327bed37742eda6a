pub mod dashboard;

use anyhow::Result;
use dashboard::{WatchConfig, WatchTarget, bridge::default_service_bundle};

pub fn run_watch(config: WatchConfig, targets: Vec<WatchTarget>) -> Result<()> {
    let bundle = default_service_bundle(&config)?;
    let context = config.view_model_context().shared();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(dashboard::watch(
        bundle.transport,
        context,
        targets,
        std::io::stdout(),
    ))
}
