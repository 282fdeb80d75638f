//! Drive the engine with scripted virtual devices: a spinner that rolls over,
//! a second stick, and a mouse, including a hot-unplug.

use axisdelta::backends::virtual_input::{VirtualBackend, VirtualDeviceSpec};
use axisdelta::{
    Axis, AxisManager, AxisRange, DeviceClass, DeviceFlags, InputMode, ManagerConfig, ManualClock,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("axisdelta=debug"))
        .init();

    let clock = ManualClock::new();
    let mut manager = AxisManager::with_clock(ManagerConfig::default(), clock.clone());

    let joysticks = VirtualBackend::new(DeviceClass::Joystick);
    let mice = VirtualBackend::new(DeviceClass::Mouse);
    let (jhub, mhub) = (joysticks.hub(), mice.hub());
    manager.set_backend(Box::new(joysticks));
    manager.set_backend(Box::new(mice));

    jhub.plug(
        VirtualDeviceSpec::joystick("spinner")
            .name("Spinner")
            .axis(0, Axis::StickX, AxisRange::U8),
    );
    jhub.plug(
        VirtualDeviceSpec::joystick("stick")
            .axis(0, Axis::StickX, AxisRange::I16)
            .axis(1, Axis::StickY, AxisRange::I16)
            .axis(6, Axis::Slider0, AxisRange::U8),
    );
    mhub.plug(VirtualDeviceSpec::mouse("mouse"));

    let report = manager.init(DeviceFlags::all());
    println!("init ok={} warnings={:?}", report.ok, report.warnings);

    let spinner = [250, 253, 0, 3, 6, 6];
    for (frame, &value) in spinner.iter().enumerate() {
        jhub.push_abs("spinner", 0, value);
        jhub.push_abs("stick", 1, -32768 + frame as i32 * 4096);
        jhub.push_abs("stick", 6, frame as i32 * 10);
        mhub.push_relative("mouse", 2.0, -1.0);

        if frame == 4 {
            jhub.unplug("stick");
            clock.advance_ms(1000);
        }

        manager.update();
        let stick = manager.axis_deltas(InputMode::AnalogStick);
        let slider = manager.axis_deltas(InputMode::Slider);
        let mouse = manager.axis_deltas(InputMode::Mouse);
        println!(
            "frame {frame}: stick=({:+.4}, {:+.4}) slider=({:+.4}, {:+.4}) mouse=({:+}, {:+}) joysticks={}",
            stick[0],
            stick[1],
            slider[0],
            slider[1],
            mouse[0],
            mouse[1],
            manager.device_count(DeviceClass::Joystick),
        );
    }

    manager.terminate();
    println!("terminated: initialized={}", manager.is_initialized());
}
