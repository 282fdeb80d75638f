//! Manager configuration (TOML).
//!
//! ```toml
//! rescan_interval_ms = 1000
//! input_dir = "/dev/input"
//! classes = ["joystick", "mouse"]
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use crate::error::{Error, Result};
use crate::flags::{DeviceClass, DeviceFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_RESCAN_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_INPUT_DIR: &str = "/dev/input";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Minimum time between two prune+scan passes.
    pub rescan_interval_ms: u64,
    /// Directory scanned for `event*` nodes by the Linux backend.
    pub input_dir: PathBuf,
    /// Classes a host should request at startup.
    pub classes: Vec<DeviceClass>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            rescan_interval_ms: DEFAULT_RESCAN_INTERVAL_MS,
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            classes: DeviceClass::ALL.to_vec(),
        }
    }
}

impl ManagerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }

    pub fn requested_flags(&self) -> DeviceFlags {
        self.classes.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() -> Result<()> {
        let cfg = ManagerConfig::from_toml_str("")?;
        assert_eq!(cfg, ManagerConfig::default());
        assert_eq!(cfg.rescan_interval(), Duration::from_secs(1));
        assert_eq!(cfg.requested_flags(), DeviceFlags::all());
        Ok(())
    }

    #[test]
    fn partial_document_overrides_keys() -> Result<()> {
        let cfg = ManagerConfig::from_toml_str(
            r#"
            rescan_interval_ms = 250
            classes = ["mouse"]
            "#,
        )?;
        assert_eq!(cfg.rescan_interval_ms, 250);
        assert_eq!(cfg.input_dir, PathBuf::from("/dev/input"));
        assert_eq!(cfg.requested_flags(), DeviceFlags::MOUSE);
        Ok(())
    }

    #[test]
    fn unknown_class_is_a_config_error() {
        let err = ManagerConfig::from_toml_str(r#"classes = ["keyboard"]"#);
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn unknown_key_is_a_config_error() {
        let err = ManagerConfig::from_toml_str("wrap_threshold = 0.25");
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = ManagerConfig::load("/nonexistent/axisdelta.toml");
        match err {
            Err(Error::ConfigIo { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/axisdelta.toml"))
            }
            other => panic!("expected ConfigIo, got {other:?}"),
        }
    }
}
