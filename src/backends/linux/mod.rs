//! Linux input backend (evdev).
//!
//! Both device classes are served from the `event*` nodes under the configured
//! input directory (default `/dev/input`):
//! - **joystick-class**: any node reporting `EV_ABS`. `ABS_X`/`ABS_Y` feed the
//!   stick, `ABS_THROTTLE`/`ABS_MISC` slider 0, `ABS_RUDDER` slider 1, each
//!   normalized with the range the kernel reports via `EVIOCGABS`.
//! - **mouse-class**: any node reporting `EV_REL` with both `REL_X` and `REL_Y`.
//!
//! Reading `/dev/input/event*` usually requires membership in the `input`
//! group. Nodes that cannot be opened are skipped silently; the class only
//! fails to come up when the directory itself cannot be read.

pub mod evdev_device;
pub mod evdev_discovery;
mod evdev_sys;

pub use evdev_device::EvdevDevice;

use crate::device::{Backend, Candidate, Device};
use crate::error::{Error, Result};
use crate::flags::DeviceClass;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Node paths currently held open by this backend's devices.
pub(crate) type OpenPaths = Arc<Mutex<HashSet<PathBuf>>>;

/// evdev-backed [`Backend`] for one device class.
pub struct EvdevBackend {
    class: DeviceClass,
    input_dir: PathBuf,
    open_paths: OpenPaths,
}

impl EvdevBackend {
    pub fn new(class: DeviceClass, input_dir: impl AsRef<Path>) -> Self {
        Self {
            class,
            input_dir: input_dir.as_ref().to_path_buf(),
            open_paths: OpenPaths::default(),
        }
    }
}

impl Backend for EvdevBackend {
    fn class(&self) -> DeviceClass {
        self.class
    }

    fn bring_up(&mut self) -> Result<()> {
        std::fs::read_dir(&self.input_dir).map(drop).map_err(|e| {
            Error::unavailable(
                self.class,
                format!("cannot read {}: {e}", self.input_dir.display()),
            )
        })
    }

    /// Nodes not already held open, with their capabilities.
    fn enumerate(&mut self) -> Vec<Candidate> {
        let nodes = match evdev_discovery::event_nodes(&self.input_dir) {
            Ok(nodes) => nodes,
            Err(e) => {
                trace!(dir = %self.input_dir.display(), error = %e, "cannot list input directory");
                return Vec::new();
            }
        };

        let held = self.open_paths.lock().clone();
        nodes
            .into_iter()
            .filter(|path| !held.contains(path))
            .filter_map(|path| {
                let file = evdev_discovery::open_node(&path)
                    .map_err(|e| trace!(path = %path.display(), error = %e, "cannot open node"))
                    .ok()?;
                evdev_discovery::describe(&path, &file)
                    .map_err(|e| trace!(path = %path.display(), error = %e, "cannot query node"))
                    .ok()
            })
            .collect()
    }

    fn open(&mut self, candidate: &Candidate) -> Result<Box<dyn Device>> {
        let path = PathBuf::from(candidate.id.as_str());
        let file = evdev_discovery::open_node(&path)
            .map_err(|e| Error::rejected(&candidate.id, e.to_string()))?;
        let resting = match self.class {
            DeviceClass::Joystick => evdev_discovery::resting_samples(&file, &candidate.caps.axes),
            DeviceClass::Mouse => Vec::new(),
        };
        Ok(Box::new(EvdevDevice::new(
            candidate.id.clone(),
            candidate.name.clone(),
            candidate.meta.clone(),
            self.class,
            path,
            file,
            resting,
            Arc::clone(&self.open_paths),
        )))
    }

    fn shut_down(&mut self) {
        self.open_paths.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bring_up_fails_without_an_input_directory() {
        let mut backend = EvdevBackend::new(DeviceClass::Mouse, "/nonexistent/axisdelta/input");
        let err = backend.bring_up();
        assert!(matches!(
            err,
            Err(Error::BackendUnavailable {
                class: DeviceClass::Mouse,
                ..
            })
        ));
        assert!(backend.enumerate().is_empty());
    }

    #[test]
    fn non_device_nodes_are_skipped() -> std::io::Result<()> {
        // Regular files named like event nodes open fine but fail every ioctl.
        let dir = std::env::temp_dir().join(format!("axisdelta-fake-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        std::fs::File::create(dir.join("event0"))?;

        let mut backend = EvdevBackend::new(DeviceClass::Joystick, &dir);
        let brought_up = backend.bring_up().is_ok();
        let candidates = backend.enumerate();
        std::fs::remove_dir_all(&dir)?;

        assert!(brought_up);
        assert!(candidates.is_empty());
        Ok(())
    }
}
