use std::{collections::HashMap, sync::Arc, time::Duration};

use once_cell::sync::Lazy;

use super::format;

/// How a raw metric value is turned into display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Number,
    Bytes,
}

impl UnitKind {
    pub fn format(self, value: f64) -> (String, String) {
        match self {
            UnitKind::Number => format::number(value),
            UnitKind::Bytes => format::bytes(value),
        }
    }
}

static STANDARD_UNITS: Lazy<HashMap<&'static str, UnitKind>> = Lazy::new(|| {
    HashMap::from([
        ("mapperRecords", UnitKind::Number),
        ("mapperBytes", UnitKind::Bytes),
        ("reducerRecords", UnitKind::Number),
        ("reducerBytes", UnitKind::Bytes),
    ])
});

/// Metric label to unit lookup.
#[derive(Debug, Clone)]
pub struct UnitTable {
    units: HashMap<String, UnitKind>,
}

impl UnitTable {
    /// The mapper/reducer table used by batch jobs.
    pub fn standard() -> Self {
        Self {
            units: STANDARD_UNITS
                .iter()
                .map(|(label, kind)| ((*label).to_string(), *kind))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            units: HashMap::new(),
        }
    }

    pub fn with_unit(mut self, label: impl Into<String>, kind: UnitKind) -> Self {
        self.units.insert(label.into(), kind);
        self
    }

    pub fn get(&self, label: &str) -> Option<UnitKind> {
        self.units.get(label).copied()
    }

    /// Unit for `label`, falling back to a plain number.
    pub fn kind_for(&self, label: &str) -> UnitKind {
        self.get(label).unwrap_or(UnitKind::Number)
    }
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Settings shared by every view-model built for one dashboard.
#[derive(Debug, Clone)]
pub struct ViewModelContext {
    /// Width of the metrics window requested on each poll.
    pub time_range: Duration,
    /// Delay between two polls of the same job.
    pub poll_interval: Duration,
    pub units: UnitTable,
}

impl ViewModelContext {
    pub const DEFAULT_TIME_RANGE: Duration = Duration::from_secs(30);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

    pub fn new(time_range: Duration, poll_interval: Duration) -> Self {
        Self {
            time_range,
            poll_interval,
            units: UnitTable::standard(),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for ViewModelContext {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIME_RANGE, Self::DEFAULT_POLL_INTERVAL)
    }
}
