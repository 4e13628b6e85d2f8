use std::path::{Path, PathBuf};

use crate::config::{BridgeConfig, BridgeMode};

/// Per-bridge state handed to the worker factory and to every frame.
///
/// Lives exactly as long as the bridge that created it.
#[derive(Debug, Clone)]
pub struct BridgeContext {
    mode: BridgeMode,
    entry_point: String,
    base_path: PathBuf,
    throttle_threshold: usize,
}

impl BridgeContext {
    pub(crate) fn from_config(config: &BridgeConfig) -> Self {
        Self {
            mode: config.mode,
            entry_point: config.entry_point.clone(),
            base_path: config.base_path.clone(),
            throttle_threshold: config.throttle_threshold,
        }
    }

    pub fn mode(&self) -> BridgeMode {
        self.mode
    }

    /// Name of the function the worker calls once per frame.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn throttle_threshold(&self) -> usize {
        self.throttle_threshold
    }

    /// Resolve `relative` against the base path. Absolute paths pass through.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.base_path.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let config = BridgeConfig::default().with_base_path("/game");
        let ctx = BridgeContext::from_config(&config);
        assert_eq!(ctx.resolve("scripts/main"), PathBuf::from("/game/scripts/main"));
        assert_eq!(ctx.resolve("/abs/x"), PathBuf::from("/abs/x"));
        assert_eq!(ctx.entry_point(), "on_frame");
    }
}
