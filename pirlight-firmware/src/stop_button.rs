//! Operator stop button
//!
//! A push button between the configured GPIO and GND. Pressing it raises
//! [`STOP_REQUESTED`], which the control loop checks at the top of every tick
//! and during the stabilization wait.
//!
//! Internal pull-up (~45kΩ) is enabled automatically; the interrupt fires on
//! the falling edge (press).

use std::sync::atomic::{AtomicBool, Ordering};

use esp_idf_hal::gpio::{AnyIOPin, Input, InterruptType, PinDriver, Pull};
use log::{info, warn};

/// Raised from the GPIO interrupt when the button is pressed
pub static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Arm the stop button interrupt.
///
/// The returned driver must be kept alive for the interrupt to stay armed.
/// Returns `None` (and logs why) if the pin could not be set up; the light
/// then runs until power-off.
pub fn init_stop_button(button_pin: u8) -> Option<PinDriver<'static, AnyIOPin, Input>> {
    // SAFETY: We trust the user-configured GPIO pin number is valid
    let pin = unsafe { AnyIOPin::new(i32::from(button_pin)) };

    let mut button = match PinDriver::input(pin) {
        Ok(b) => b,
        Err(e) => {
            warn!("Failed to initialize stop button on GPIO {button_pin}: {e:?}");
            return None;
        }
    };

    if let Err(e) = button.set_pull(Pull::Up) {
        warn!("Failed to set stop button pull-up: {e:?}");
        return None;
    }

    if let Err(e) = button.set_interrupt_type(InterruptType::NegEdge) {
        warn!("Failed to set stop button interrupt type: {e:?}");
        return None;
    }

    // SAFETY: The callback only stores to an atomic, which is ISR-safe
    let subscribed = unsafe {
        button.subscribe(|| {
            STOP_REQUESTED.store(true, Ordering::Relaxed);
        })
    };
    if let Err(e) = subscribed {
        warn!("Failed to subscribe to stop button interrupt: {e:?}");
        return None;
    }

    // One press is enough, so the interrupt is never re-enabled after it fires
    if let Err(e) = button.enable_interrupt() {
        warn!("Failed to enable stop button interrupt: {e:?}");
        return None;
    }

    info!("Stop button armed on GPIO {button_pin}");
    Some(button)
}
