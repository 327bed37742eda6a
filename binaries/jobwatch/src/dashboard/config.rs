use std::time::Duration;

use super::context::ViewModelContext;

pub const PROTOCOL_URL_ENV: &str = "JOBWATCH_PROTOCOL_URL";
pub const DEFAULT_PROTOCOL_URL: &str = "http://127.0.0.1:10000";
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub protocol_url: String,
    pub poll_interval: Duration,
    pub time_range: Duration,
}

impl WatchConfig {
    pub fn view_model_context(&self) -> ViewModelContext {
        ViewModelContext::new(self.time_range, self.poll_interval.max(MIN_POLL_INTERVAL))
    }
}
