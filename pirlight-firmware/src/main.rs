use anyhow::Result;
use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::gpio::{AnyIOPin, PinDriver, Pull};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::prelude::*;
use log::{debug, error, info, warn};
use pirlight_control_lib::{ExitReason, MonotonicClock, MotionLightController};

mod config;
mod stop_button;
mod watchdog;

use config::Config;
use stop_button::{init_stop_button, STOP_REQUESTED};
use watchdog::{WatchdogDelay, WatchdogHandle};

fn main() -> Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Starting pirlight firmware {}...", env!("GIT_VERSION"));

    let peripherals = Peripherals::take()?;
    let config = Config::load_or_default();

    // Apply configured log level
    let level = config.log_level.as_level_filter();
    if let Err(e) = esp_idf_svc::log::set_target_level("*", level) {
        warn!("Failed to set log level: {e}");
    } else {
        info!("Log level set to {:?}", config.log_level);
    }

    info!("Initializing PIR sensor on GPIO {}...", config.sensor_gpio);
    // SAFETY: We trust the user-configured GPIO pin number is valid for this board
    let sensor_pin = unsafe { AnyIOPin::new(i32::from(config.sensor_gpio)) };
    let mut sensor = PinDriver::input(sensor_pin)?;
    // Keep a disconnected sensor reading "no motion" rather than floating
    sensor.set_pull(Pull::Down)?;

    info!(
        "Initializing light PWM on GPIO {} at {} Hz...",
        config.light_gpio, config.pwm_frequency_hz
    );
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(config.pwm_frequency_hz.Hz())
            .resolution(Resolution::Bits13),
    )?;
    // SAFETY: We trust the user-configured GPIO pin number is valid for this board
    let light_pin = unsafe { AnyIOPin::new(i32::from(config.light_gpio)) };
    let light = LedcDriver::new(peripherals.ledc.channel0, &timer, light_pin)?;
    debug!("Light PWM max duty: {}", light.get_max_duty());

    let _stop_button = if config.stop_button_gpio == 0 {
        debug!("Stop button disabled (pin not configured)");
        None
    } else {
        info!("Initializing stop button on GPIO {}...", config.stop_button_gpio);
        init_stop_button(config.stop_button_gpio)
    };

    let watchdog = WatchdogHandle::register(c"pirlight");
    let delay = WatchdogDelay::new(Delay::new_default(), &watchdog);
    let mut controller = MotionLightController::new(
        sensor,
        light,
        MonotonicClock::new(),
        delay,
        config.controller.clone(),
    );

    match controller.run(&STOP_REQUESTED) {
        ExitReason::Interrupted => info!("Controller stopped by operator"),
        ExitReason::Faulted(fault) => error!("Controller stopped on fault: {fault}"),
    }
    let stats = controller.stats();
    info!(
        "Ran {} ticks, {} with motion, {} fade-ins, {} fade-outs",
        stats.ticks, stats.motion_ticks, stats.fade_ins, stats.fade_outs
    );

    // Never return: dropping the LEDC driver releases the pin to its idle
    // level, which turns an inverted light fully on.
    info!("Light is off, halting");
    loop {
        watchdog.feed();
        FreeRtos::delay_ms(1000);
    }
}
