//! Local-peer configuration consumed by the push engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// Settings for the local device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// This peer's binary device identity.
    pub device_id: DeviceId,
    /// Directory for spilled upload sources.
    ///
    /// `None` uses the system temp directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

impl DeviceConfig {
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            temp_dir: None,
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}
