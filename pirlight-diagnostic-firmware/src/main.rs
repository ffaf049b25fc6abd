//! Field diagnostic for a PIR sensor.
//!
//! Flash, open the serial monitor and follow the prompts: stay still, move in
//! front of the sensor, stay still again. The verdict and recommendations are
//! logged at the end.

use anyhow::Result;
use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::gpio::{AnyIOPin, PinDriver, Pull};
use log::{info, warn};
use pirlight_control_lib::{MonotonicClock, PirDiagnostic};

mod config;

use config::Config;

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Starting pirlight-diagnostic firmware...");

    let config = Config::load_or_default();
    let level = config.log_level.as_level_filter();
    if let Err(e) = esp_idf_svc::log::set_target_level("*", level) {
        warn!("Failed to set log level: {e}");
    }

    info!("Testing PIR sensor on GPIO {}", config.sensor_gpio);
    // SAFETY: We trust the user-configured GPIO pin number is valid for this board
    let pin = unsafe { AnyIOPin::new(i32::from(config.sensor_gpio)) };
    let mut sensor = PinDriver::input(pin)?;
    sensor.set_pull(Pull::Down)?;

    let mut diagnostic = PirDiagnostic::new(
        sensor,
        MonotonicClock::new(),
        Delay::new_default(),
        config.diagnostic.clone(),
    );
    let report = diagnostic.run()?;
    info!("Diagnostic complete: {:?}", report.diagnosis);

    loop {
        FreeRtos::delay_ms(1000);
    }
}
