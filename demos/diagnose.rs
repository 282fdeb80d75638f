//! Bring up every device class once and dump what was found as JSON.
//!
//! Useful for checking permissions (`/dev/input` access on Linux) and for
//! seeing which axes a device exposes before wiring it into a game.

use axisdelta::{AxisManager, DeviceClass, DeviceFlags, ManagerConfig};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut manager = AxisManager::new(ManagerConfig::default());
    let report = manager.init(DeviceFlags::all());

    let summary = json!({
        "ok": report.ok,
        "warnings": report.warnings,
        "initialized": {
            "joystick": manager.is_initialized_for(DeviceFlags::JOYSTICK),
            "mouse": manager.is_initialized_for(DeviceFlags::MOUSE),
        },
        "counts": {
            "joystick": manager.device_count(DeviceClass::Joystick),
            "mouse": manager.device_count(DeviceClass::Mouse),
        },
        "devices": manager.devices(),
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&summary).expect("serialize device listing")
    );
}
