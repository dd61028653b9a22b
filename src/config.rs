//! Config for the `stitch` demo binary. The library itself takes an
//! explicit [`crate::MergeSchemasOptions`] and keeps no config state of its
//! own — this struct only exists for the CLI's convenience, the same way
//! the teacher's own YAML config only ever concerned its binary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchConfig {
    /// SDL files to stitch together, in merge order.
    #[serde(default)]
    pub schemas: Vec<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            schemas: Vec::new(),
            log_level: default_log_level(),
        }
    }
}
