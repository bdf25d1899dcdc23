use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::shared::ConfigType;

/// Settings of one verification run.
#[derive(Debug, Clone)]
pub struct Config {
    scenario_timeout: Duration,
    compare_summary: bool,
    summary_marker_suffix: String,
}

impl ConfigType for Config {
    fn default() -> Self {
        Self {
            scenario_timeout: Duration::from_secs(120),
            compare_summary: true,
            summary_marker_suffix: ".skip-summary".to_string(),
        }
    }
}

impl Config {
    pub fn with_scenario_timeout(mut self, timeout: Duration) -> Self {
        self.scenario_timeout = timeout;
        self
    }

    pub fn with_compare_summary(mut self, compare_summary: bool) -> Self {
        self.compare_summary = compare_summary;
        self
    }

    pub fn with_summary_marker_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.summary_marker_suffix = suffix.into();
        self
    }

    pub fn scenario_timeout(&self) -> Duration {
        self.scenario_timeout
    }

    pub fn compare_summary(&self) -> bool {
        self.compare_summary
    }

    /// Companion file whose presence disables the summary comparison for
    /// the fixture at `expected`.
    pub fn summary_marker(&self, expected: &Path) -> PathBuf {
        let mut name = expected.file_name().unwrap_or_default().to_os_string();
        name.push(&self.summary_marker_suffix);
        expected.with_file_name(name)
    }

    /// Whether the summaries of `expected` and its counterpart are compared.
    pub fn should_compare_summary(&self, expected: &Path) -> bool {
        self.compare_summary && !self.summary_marker(expected).exists()
    }
}
