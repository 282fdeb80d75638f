//! Error type shared by backends, the device set, and configuration loading.
//!
//! Per-frame operations never surface these: [`AxisManager::update`] turns a
//! failing device into a disconnection and [`AxisManager::init`] turns a failing
//! class into a warning string. Only configuration loading returns them to the
//! caller directly.
//!
//! [`AxisManager::update`]: crate::manager::AxisManager::update
//! [`AxisManager::init`]: crate::manager::AxisManager::init

use crate::device::DeviceId;
use crate::flags::DeviceClass;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend for a whole device class could not be brought up.
    #[error("{class} backend unavailable: {reason}")]
    BackendUnavailable { class: DeviceClass, reason: String },

    /// No backend is registered for the class on this platform.
    #[error("{0}: no backend available on this platform")]
    NoBackend(DeviceClass),

    /// A candidate lacks the raw capability its class needs, or refused to open.
    #[error("device {id} rejected: {reason}")]
    Rejected { id: DeviceId, reason: String },

    /// A device stopped answering (poll or probe failure).
    #[error("device {0} disconnected")]
    Disconnected(DeviceId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn rejected(id: &DeviceId, reason: impl Into<String>) -> Self {
        Error::Rejected {
            id: id.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(class: DeviceClass, reason: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            class,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_class_and_device() {
        let err = Error::unavailable(DeviceClass::Mouse, "no window handle");
        assert_eq!(err.to_string(), "mouse backend unavailable: no window handle");

        let err = Error::NoBackend(DeviceClass::Joystick);
        assert_eq!(err.to_string(), "joystick: no backend available on this platform");

        let err = Error::rejected(&DeviceId::new("virtual:3"), "no absolute axes");
        assert_eq!(err.to_string(), "device virtual:3 rejected: no absolute axes");
    }
}
