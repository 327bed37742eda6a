use std::fmt;

use serde::{Serialize, Serializer};

/// Lifecycle state reported by the gateway.
///
/// The gateway is authoritative, so values outside the known set are kept
/// verbatim in `Unknown` instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobState {
    Deployed,
    Stopped,
    Stopping,
    Starting,
    Running,
    Pausing,
    Paused,
    Adjusting,
    Draining,
    Failed,
    Unknown(String),
}

impl JobState {
    pub const KNOWN: [JobState; 10] = [
        JobState::Deployed,
        JobState::Stopped,
        JobState::Stopping,
        JobState::Starting,
        JobState::Running,
        JobState::Pausing,
        JobState::Paused,
        JobState::Adjusting,
        JobState::Draining,
        JobState::Failed,
    ];

    /// Exact parse of a wire status string. Any other spelling, including a
    /// different case, is kept as `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "DEPLOYED" => JobState::Deployed,
            "STOPPED" => JobState::Stopped,
            "STOPPING" => JobState::Stopping,
            "STARTING" => JobState::Starting,
            "RUNNING" => JobState::Running,
            "PAUSING" => JobState::Pausing,
            "PAUSED" => JobState::Paused,
            "ADJUSTING" => JobState::Adjusting,
            "DRAINING" => JobState::Draining,
            "FAILED" => JobState::Failed,
            _ => JobState::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Deployed => "DEPLOYED",
            JobState::Stopped => "STOPPED",
            JobState::Stopping => "STOPPING",
            JobState::Starting => "STARTING",
            JobState::Running => "RUNNING",
            JobState::Pausing => "PAUSING",
            JobState::Paused => "PAUSED",
            JobState::Adjusting => "ADJUSTING",
            JobState::Draining => "DRAINING",
            JobState::Failed => "FAILED",
            JobState::Unknown(raw) => raw,
        }
    }

    /// Label of the primary action button, `None` for states without one
    /// (`PAUSING`, `PAUSED` and anything unmapped).
    ///
    /// The table lookup ignores case, so `Unknown("running")` still labels
    /// its button `Pause` while every other check treats it as unknown.
    pub fn default_action(&self) -> Option<&'static str> {
        match self {
            JobState::Unknown(raw) => match JobState::parse(&raw.to_ascii_uppercase()) {
                JobState::Unknown(_) => None,
                known => known.default_action(),
            },
            JobState::Deployed
            | JobState::Stopped
            | JobState::Stopping
            | JobState::Starting
            | JobState::Failed => Some("Start"),
            JobState::Running => Some("Pause"),
            JobState::Adjusting | JobState::Draining => Some("..."),
            JobState::Pausing | JobState::Paused => None,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Icon shown on the start/pause toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionIcon {
    #[serde(rename = "start-icon")]
    Start,
    #[serde(rename = "pause-icon")]
    Pause,
}

impl ActionIcon {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionIcon::Start => "start-icon",
            ActionIcon::Pause => "pause-icon",
        }
    }
}

/// Label used when the state has no entry in the action table.
pub const UNKNOWN_ACTION: &str = "Unknown";
