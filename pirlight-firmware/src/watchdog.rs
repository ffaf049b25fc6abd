//! Task watchdog integration for the control loop.
//!
//! [`WatchdogHandle`] wraps a user registration with ESP-IDF's Task Watchdog
//! Timer (TWDT). [`WatchdogDelay`] feeds it from inside every sleep, so the
//! blocking fades and the stabilization wait keep the watchdog happy without
//! the controller knowing it exists.

use embedded_hal::delay::DelayNs;
use esp_idf_svc::sys::{
    esp_task_wdt_add_user, esp_task_wdt_delete_user, esp_task_wdt_reset_user,
    esp_task_wdt_user_handle_t,
};
use log::{debug, error};
use std::ffi::CStr;

/// Longest single sleep between feeds
const MAX_SLEEP_MS: u32 = 1000;

/// A handle to a registered watchdog user. Automatically unregisters on drop.
pub struct WatchdogHandle {
    handle: esp_task_wdt_user_handle_t,
    name: &'static CStr,
}

impl WatchdogHandle {
    /// Register a new watchdog user with the given name.
    ///
    /// # Panics
    /// Panics if registration fails (critical system error).
    pub fn register(name: &'static CStr) -> Self {
        let mut handle: esp_task_wdt_user_handle_t = std::ptr::null_mut();

        let result = unsafe { esp_task_wdt_add_user(name.as_ptr(), &mut handle) };

        if result == 0 {
            debug!("Watchdog: registered user '{name:?}'");
            Self { handle, name }
        } else {
            panic!("Watchdog: failed to register user '{name:?}': error code {result}");
        }
    }

    /// Feed the watchdog. Must happen within the TWDT timeout period.
    pub fn feed(&self) {
        let result = unsafe { esp_task_wdt_reset_user(self.handle) };
        if result != 0 {
            error!("Watchdog: failed to feed '{:?}'", self.name);
        }
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        debug!("Watchdog: unregistering user '{:?}'", self.name);
        let result = unsafe { esp_task_wdt_delete_user(self.handle) };
        if result != 0 {
            error!(
                "Watchdog: failed to unregister '{:?}': error code {result}",
                self.name
            );
        }
    }
}

/// Delay that feeds a watchdog before and during every sleep.
///
/// Long sleeps are split into chunks of at most [`MAX_SLEEP_MS`].
pub struct WatchdogDelay<'a, D> {
    inner: D,
    watchdog: &'a WatchdogHandle,
}

impl<'a, D: DelayNs> WatchdogDelay<'a, D> {
    pub fn new(inner: D, watchdog: &'a WatchdogHandle) -> Self {
        Self { inner, watchdog }
    }
}

impl<D: DelayNs> DelayNs for WatchdogDelay<'_, D> {
    fn delay_ns(&mut self, ns: u32) {
        self.watchdog.feed();
        self.inner.delay_ns(ns);
    }

    fn delay_ms(&mut self, mut ms: u32) {
        self.watchdog.feed();
        while ms > 0 {
            let chunk = ms.min(MAX_SLEEP_MS);
            self.inner.delay_ms(chunk);
            self.watchdog.feed();
            ms -= chunk;
        }
    }
}
