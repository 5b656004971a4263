//! Progress reporting for long archive operations.

/// Receives progress from extract, rebuild and patch passes. All methods
/// default to doing nothing.
pub trait Progress {
    fn set_max(&mut self, max: u64) {
        let _ = max;
    }

    fn set_value(&mut self, value: u64) {
        let _ = value;
    }

    /// Called once per resource after it is processed.
    fn on_entry_complete(&mut self, name: &str, success: bool) {
        let _ = (name, success);
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Logs every tenth percent through `tracing`.
#[derive(Debug)]
pub struct LogProgress {
    label: String,
    max: u64,
    last_decile: Option<u64>,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        LogProgress {
            label: label.into(),
            max: 0,
            last_decile: None,
        }
    }
}

impl Progress for LogProgress {
    fn set_max(&mut self, max: u64) {
        self.max = max;
        self.last_decile = None;
    }

    fn set_value(&mut self, value: u64) {
        if self.max == 0 {
            return;
        }
        let decile = value.min(self.max) * 10 / self.max;
        if self.last_decile != Some(decile) {
            self.last_decile = Some(decile);
            tracing::info!("{}: {}%", self.label, decile * 10);
        }
    }

    fn on_entry_complete(&mut self, name: &str, success: bool) {
        if success {
            tracing::debug!("{}: {}", self.label, name);
        } else {
            tracing::warn!("{}: {} failed", self.label, name);
        }
    }
}

/// Counts completed entries, for tests and summaries.
#[derive(Clone, Debug, Default)]
pub struct CountingProgress {
    pub max: u64,
    pub value: u64,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl Progress for CountingProgress {
    fn set_max(&mut self, max: u64) {
        self.max = max;
    }

    fn set_value(&mut self, value: u64) {
        self.value = value;
    }

    fn on_entry_complete(&mut self, name: &str, success: bool) {
        if success {
            self.succeeded.push(name.to_string());
        } else {
            self.failed.push(name.to_string());
        }
    }
}
