/// Configuration for the workflow definition loader
///
/// Where workflow sources live and the few loader-level options builder
/// primitives may consult.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Directory scanned for `*.lua` workflow sources (default: "workflows")
    pub workflows_dir: PathBuf,
    /// Default filesystem address used by the one-argument form of
    /// hdfsCheckTrigger (e.g. "hdfs://nameservice1"). None means the
    /// one-argument form is an error.
    pub default_fs: Option<String>,
}

impl Default for LoaderConfig {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            workflows_dir: std::env::var("GANTRY_WORKFLOWS_DIR")
                .unwrap_or_else(|_| "workflows".to_string())
                .into(),
            default_fs: std::env::var("GANTRY_DEFAULT_FS").ok(),
        }
    }
}
