//! Print per-frame stick, slider and mouse deltas from every connected device.
//!
//! Usage: `cargo run --example poll [config.toml]`. Set `RUST_LOG=axisdelta=debug`
//! to watch devices come and go.

use axisdelta::{AxisManager, InputMode, ManagerConfig};
use std::io::Write;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ManagerConfig::load(&path).expect("load config"),
        None => ManagerConfig::default(),
    };
    let requested = config.requested_flags();

    let mut manager = AxisManager::new(config);
    let report = manager.init(requested);
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if !report.ok {
        eprintln!("Init failed: no device class could be brought up");
        std::process::exit(1);
    }

    println!("Reading all devices (Ctrl+C to exit)\n");

    let mut out = std::io::stdout();
    loop {
        manager.update();

        let stick = manager.axis_deltas(InputMode::AnalogStick);
        let slider = manager.axis_deltas(InputMode::Slider);
        let mouse = manager.axis_deltas(InputMode::Mouse);

        print!(
            "\rStick: X={:6.2} Y={:6.2} | Slider: 0={:6.2} 1={:6.2} | Mouse: X={:6.0} Y={:6.0}",
            stick[0], stick[1], slider[0], slider[1], mouse[0], mouse[1]
        );
        let _ = out.flush();

        std::thread::sleep(Duration::from_millis(16));
    }
}
