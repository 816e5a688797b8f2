//! Serializable renderer configuration.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "assetRoot": "/srv/cdn",
//!   "timeoutMs": 5000,
//!   "recolorMode": "multiply",
//!   "frames": null
//! }
//! ```
//!
//! Every field is optional. Leaving out `frames` keeps the built-in table.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::asset::FsAssetStore;
use crate::deadline::Deadline;
use crate::error::ConfigError;
use crate::frame::{FrameGeometry, FrameRegistry};
use crate::layer::RecolorMode;

fn default_asset_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_timeout_ms() -> u64 {
    Deadline::REFERENCE_BUDGET.as_millis() as u64
}

/// Settings shared by every render of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Directory holding `public/` and `private/` asset trees.
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,

    /// End-to-end budget of a single render, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub recolor_mode: RecolorMode,

    /// Replaces the built-in frame table when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<FrameGeometry>>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            asset_root: default_asset_root(),
            timeout_ms: default_timeout_ms(),
            recolor_mode: RecolorMode::default(),
            frames: None,
        }
    }
}

impl RenderConfig {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            ..Self::default()
        }
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Starts the deadline for one render.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout())
    }

    /// Builds the frame registry, validating configured frames.
    pub fn registry(&self) -> Result<FrameRegistry, ConfigError> {
        match &self.frames {
            Some(frames) => FrameRegistry::new(frames.clone()),
            None => Ok(FrameRegistry::builtin()),
        }
    }

    pub fn asset_store(&self) -> FsAssetStore {
        FsAssetStore::new(&self.asset_root)
    }
}
