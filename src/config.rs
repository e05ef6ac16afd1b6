//! Feed configuration - loaded from ganttfeed.yml

use crate::core::PublishMode;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Demo/pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FeedConfig {
    /// Whether the cell republishes deltas or a running aggregate
    pub publish_mode: PublishMode,
    /// Number of project records the simulated feed emits
    pub record_count: usize,
    pub sprints_per_project: usize,
    /// Delay between simulated record emissions
    pub emit_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            publish_mode: PublishMode::Incremental,
            record_count: 5,
            sprints_per_project: 3,
            emit_interval_ms: 500,
        }
    }
}

impl FeedConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FeedConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load ganttfeed.yml from the current directory, or fall back to
    /// defaults when no config file exists.
    pub fn auto_load() -> Result<Self> {
        let path = Path::new("ganttfeed.yml");
        if path.exists() {
            return Self::from_file(path);
        }
        Ok(Self::default())
    }
}
