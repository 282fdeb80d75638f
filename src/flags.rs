//! Device classes and the capability mask.
//!
//! A [`DeviceClass`] names one category of physical device with its own raw
//! capabilities and output channels. [`DeviceFlags`] is a set over those
//! classes; the manager uses it both for what a caller *requests* from
//! [`AxisManager::init`](crate::manager::AxisManager::init) and for what has
//! actually been brought up.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an input device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Devices with absolute positional axes (sticks, sliders, dials).
    Joystick,
    /// Pointer devices reporting relative X/Y motion.
    Mouse,
}

impl DeviceClass {
    /// Every class, in the order the manager processes them.
    pub const ALL: [DeviceClass; 2] = [DeviceClass::Joystick, DeviceClass::Mouse];
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Joystick => f.write_str("joystick"),
            DeviceClass::Mouse => f.write_str("mouse"),
        }
    }
}

bitflags! {
    /// Set of device classes.
    ///
    /// Supports the usual set algebra (`|`, `&`, `!`, `-`, [`contains`](Self::contains)).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DeviceFlags: u8 {
        const JOYSTICK = 0b0000_0001;
        const MOUSE    = 0b0000_0010;
    }
}

impl DeviceFlags {
    /// Iterate the classes contained in this set.
    pub fn classes(self) -> impl Iterator<Item = DeviceClass> {
        DeviceClass::ALL
            .into_iter()
            .filter(move |class| self.contains(DeviceFlags::from(*class)))
    }
}

impl From<DeviceClass> for DeviceFlags {
    fn from(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Joystick => DeviceFlags::JOYSTICK,
            DeviceClass::Mouse => DeviceFlags::MOUSE,
        }
    }
}

impl FromIterator<DeviceClass> for DeviceFlags {
    fn from_iter<I: IntoIterator<Item = DeviceClass>>(iter: I) -> Self {
        iter.into_iter()
            .fold(DeviceFlags::empty(), |acc, class| acc | class.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_drops_already_initialized_classes() {
        let requested = DeviceFlags::JOYSTICK | DeviceFlags::MOUSE;
        let initialized = DeviceFlags::JOYSTICK;
        assert_eq!(requested - initialized, DeviceFlags::MOUSE);
        assert_eq!(requested & !initialized, DeviceFlags::MOUSE);
        assert!((initialized - requested).is_empty());
    }

    #[test]
    fn classes_iterates_members_in_processing_order() {
        let all: Vec<_> = DeviceFlags::all().classes().collect();
        assert_eq!(all, vec![DeviceClass::Joystick, DeviceClass::Mouse]);
        assert_eq!(DeviceFlags::empty().classes().count(), 0);
        assert_eq!(
            DeviceFlags::MOUSE.classes().collect::<Vec<_>>(),
            vec![DeviceClass::Mouse]
        );
    }

    #[test]
    fn collects_from_classes() {
        let flags: DeviceFlags = [DeviceClass::Mouse, DeviceClass::Joystick].into_iter().collect();
        assert_eq!(flags, DeviceFlags::all());
    }

    #[test]
    fn class_names_are_lowercase() {
        assert_eq!(DeviceClass::Joystick.to_string(), "joystick");
        assert_eq!(DeviceClass::Mouse.to_string(), "mouse");
    }
}
