use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Default number of frames the worker may lag before `submit` blocks.
pub const DEFAULT_THROTTLE_THRESHOLD: usize = 3;

/// Default starting capacity of each bridge buffer: 64 KiB.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Default name of the worker's per-frame entry point.
pub const DEFAULT_ENTRY_POINT: &str = "on_frame";

/// Default name of the pipelined worker thread.
pub const DEFAULT_THREAD_NAME: &str = "tickbridge-worker";

/// Where the worker runs relative to the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeMode {
    /// The worker runs inside `submit` on the caller's thread.
    Direct,
    /// The worker runs on its own thread, up to the throttle threshold behind.
    #[default]
    Pipelined,
}

impl BridgeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Pipelined => "pipelined",
        }
    }
}

impl fmt::Display for BridgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a [`FrameBridge`](crate::FrameBridge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Direct or pipelined execution. Default: pipelined.
    pub mode: BridgeMode,
    /// Frames the worker may fall behind before `submit` blocks. Default: 3.
    pub throttle_threshold: usize,
    /// Starting capacity of the input and output buffers. Default: 64 KiB.
    pub initial_buffer_capacity: usize,
    /// Name of the worker's per-frame entry point. Default: `on_frame`.
    pub entry_point: String,
    /// Directory the worker resolves scripts and assets against.
    pub base_path: PathBuf,
    /// Name given to the pipelined worker thread.
    pub thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: BridgeMode::default(),
            throttle_threshold: DEFAULT_THROTTLE_THRESHOLD,
            initial_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            base_path: PathBuf::from("."),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn with_mode(mut self, mode: BridgeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_throttle_threshold(mut self, threshold: usize) -> Self {
        self.throttle_threshold = threshold;
        self
    }

    pub fn with_initial_buffer_capacity(mut self, capacity: usize) -> Self {
        self.initial_buffer_capacity = capacity;
        self
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Reject configurations the bridge cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.throttle_threshold == 0 {
            return Err(BridgeError::InvalidConfig(
                "throttle_threshold must be at least 1".to_string(),
            ));
        }
        if self.entry_point.trim().is_empty() {
            return Err(BridgeError::InvalidConfig(
                "entry_point must not be empty".to_string(),
            ));
        }
        if self.mode == BridgeMode::Pipelined && self.thread_name.contains('\0') {
            return Err(BridgeError::InvalidConfig(
                "thread_name must not contain NUL".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.mode, BridgeMode::Pipelined);
        assert_eq!(config.throttle_threshold, 3);
        assert_eq!(config.initial_buffer_capacity, 64 * 1024);
        assert_eq!(config.entry_point, "on_frame");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let config = BridgeConfig::default().with_throttle_threshold(0);
        assert!(matches!(config.validate(), Err(BridgeError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_blank_entry_point() {
        let config = BridgeConfig::default().with_entry_point("  ");
        assert!(matches!(config.validate(), Err(BridgeError::InvalidConfig(_))));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"mode":"direct","throttle_threshold":5}"#).unwrap();
        assert_eq!(config.mode, BridgeMode::Direct);
        assert_eq!(config.throttle_threshold, 5);
        assert_eq!(config.entry_point, DEFAULT_ENTRY_POINT);
    }
}
