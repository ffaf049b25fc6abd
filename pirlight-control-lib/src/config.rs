//! Start-up constants for the controller and the sensor diagnostic.
//!
//! Both structs deserialize from partial JSON: any field left out takes its
//! default, so an empty object yields the stock configuration.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::debounce::DEFAULT_CONFIRM_INTERVAL_MS;
use crate::gamma::{DEFAULT_GAMMA, DEFAULT_TABLE_STEP};

/// Longest accepted tick interval. Longer ticks make the light feel unresponsive.
pub const MAX_TICK_INTERVAL_MS: u32 = 1000;

/// Longest accepted per-step fade delay
pub const MAX_FADE_STEP_DELAY_MS: u32 = 100;

/// Motion light controller constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// How long the light stays on after the last confirmed motion (ms)
    #[serde(default = "default_motion_timeout_ms")]
    pub motion_timeout_ms: u64,
    /// `true` when a higher duty cycle makes the light dimmer
    #[serde(default = "default_inverted_output")]
    pub inverted_output: bool,
    /// Sleep between control loop ticks (ms)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u32,
    /// Gap between debounce confirmation reads (ms)
    #[serde(default = "default_debounce_interval_ms")]
    pub debounce_interval_ms: u32,
    /// Brightness change per fade step (percent)
    #[serde(default = "default_fade_step_percent")]
    pub fade_step_percent: u8,
    /// Delay after each fade-in step (ms)
    #[serde(default = "default_fade_in_step_delay_ms")]
    pub fade_in_step_delay_ms: u32,
    /// Delay after each fade-out step (ms)
    #[serde(default = "default_fade_out_step_delay_ms")]
    pub fade_out_step_delay_ms: u32,
    /// Gamma correction exponent
    #[serde(default = "default_gamma")]
    pub gamma: f32,
    /// Gamma lookup table grid spacing (percent)
    #[serde(default = "default_gamma_table_step")]
    pub gamma_table_step: u8,
    /// Sensor warm-up time after power-on before motion is trusted (s)
    #[serde(default = "default_stabilization_secs")]
    pub stabilization_secs: u32,
    /// Interval between status heartbeat log lines (s), 0 to disable
    #[serde(default = "default_status_log_interval_secs")]
    pub status_log_interval_secs: u32,
}

const fn default_motion_timeout_ms() -> u64 {
    10_000
}

const fn default_inverted_output() -> bool {
    true
}

const fn default_tick_interval_ms() -> u32 {
    100
}

const fn default_debounce_interval_ms() -> u32 {
    DEFAULT_CONFIRM_INTERVAL_MS
}

const fn default_fade_step_percent() -> u8 {
    5
}

const fn default_fade_in_step_delay_ms() -> u32 {
    10
}

const fn default_fade_out_step_delay_ms() -> u32 {
    15
}

const fn default_gamma() -> f32 {
    DEFAULT_GAMMA
}

const fn default_gamma_table_step() -> u8 {
    DEFAULT_TABLE_STEP
}

const fn default_stabilization_secs() -> u32 {
    10
}

const fn default_status_log_interval_secs() -> u32 {
    30
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            motion_timeout_ms: default_motion_timeout_ms(),
            inverted_output: default_inverted_output(),
            tick_interval_ms: default_tick_interval_ms(),
            debounce_interval_ms: default_debounce_interval_ms(),
            fade_step_percent: default_fade_step_percent(),
            fade_in_step_delay_ms: default_fade_in_step_delay_ms(),
            fade_out_step_delay_ms: default_fade_out_step_delay_ms(),
            gamma: default_gamma(),
            gamma_table_step: default_gamma_table_step(),
            stabilization_secs: default_stabilization_secs(),
            status_log_interval_secs: default_status_log_interval_secs(),
        }
    }
}

impl ControllerConfig {
    /// Clamp values to valid ranges and fix invalid values
    pub fn validate(&mut self) {
        if self.motion_timeout_ms == 0 {
            warn!("motion_timeout_ms must be positive, resetting to default");
            self.motion_timeout_ms = default_motion_timeout_ms();
        }
        if self.tick_interval_ms == 0 {
            warn!("tick_interval_ms must be positive, resetting to default");
            self.tick_interval_ms = default_tick_interval_ms();
        }
        if self.tick_interval_ms > MAX_TICK_INTERVAL_MS {
            warn!("Clamping tick_interval_ms from {} to {MAX_TICK_INTERVAL_MS}", self.tick_interval_ms);
            self.tick_interval_ms = MAX_TICK_INTERVAL_MS;
        }
        if !(1..=100).contains(&self.fade_step_percent) {
            warn!("fade_step_percent {} out of range, resetting to default", self.fade_step_percent);
            self.fade_step_percent = default_fade_step_percent();
        }
        if self.fade_in_step_delay_ms > MAX_FADE_STEP_DELAY_MS {
            warn!(
                "Clamping fade_in_step_delay_ms from {} to {MAX_FADE_STEP_DELAY_MS}",
                self.fade_in_step_delay_ms
            );
            self.fade_in_step_delay_ms = MAX_FADE_STEP_DELAY_MS;
        }
        if self.fade_out_step_delay_ms > MAX_FADE_STEP_DELAY_MS {
            warn!(
                "Clamping fade_out_step_delay_ms from {} to {MAX_FADE_STEP_DELAY_MS}",
                self.fade_out_step_delay_ms
            );
            self.fade_out_step_delay_ms = MAX_FADE_STEP_DELAY_MS;
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            warn!("gamma {} is not a positive number, resetting to default", self.gamma);
            self.gamma = default_gamma();
        }
        if !(1..=100).contains(&self.gamma_table_step) {
            warn!("gamma_table_step {} out of range, resetting to default", self.gamma_table_step);
            self.gamma_table_step = default_gamma_table_step();
        }
    }
}

/// PIR sensor diagnostic timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticConfig {
    /// Warm-up time before the first test window (s)
    #[serde(default = "default_diag_stabilization_secs")]
    pub stabilization_secs: u32,
    /// Time given to the operator to get into position before each window (s)
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u32,
    /// Length of each sampling window (s)
    #[serde(default = "default_window_secs")]
    pub window_secs: u32,
    /// Gap between samples within a window (ms)
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u32,
}

const fn default_diag_stabilization_secs() -> u32 {
    60
}

const fn default_settle_secs() -> u32 {
    3
}

const fn default_window_secs() -> u32 {
    10
}

const fn default_sample_interval_ms() -> u32 {
    500
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            stabilization_secs: default_diag_stabilization_secs(),
            settle_secs: default_settle_secs(),
            window_secs: default_window_secs(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

impl DiagnosticConfig {
    /// Clamp values so every window takes at least one sample
    pub fn validate(&mut self) {
        if self.window_secs == 0 {
            warn!("window_secs must be positive, resetting to default");
            self.window_secs = default_window_secs();
        }
        if self.sample_interval_ms == 0 {
            warn!("sample_interval_ms must be positive, resetting to default");
            self.sample_interval_ms = default_sample_interval_ms();
        }
        let window_ms = self.window_secs.saturating_mul(1000);
        if self.sample_interval_ms > window_ms {
            warn!("Clamping sample_interval_ms from {} to {window_ms}", self.sample_interval_ms);
            self.sample_interval_ms = window_ms;
        }
    }
}
