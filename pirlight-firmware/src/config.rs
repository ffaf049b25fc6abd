use anyhow::Result;
use log::{debug, info, warn, LevelFilter};
use pirlight_control_lib::ControllerConfig;
use serde::{Deserialize, Serialize};

/// Start-up configuration embedded by `build.rs` (`{}` when no file was provided)
const EMBEDDED_CONFIG: &str = include_str!(concat!(env!("OUT_DIR"), "/pirlight.json"));

/// Configurable log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log_level: LogLevel,
    /// PIR sensor output
    #[serde(default = "default_sensor_gpio")]
    pub sensor_gpio: u8,
    /// PWM output driving the light
    #[serde(default = "default_light_gpio")]
    pub light_gpio: u8,
    /// Stop button (connects to GND when pressed) - set to 0 to disable
    #[serde(default)]
    pub stop_button_gpio: u8,
    /// LEDC PWM frequency
    #[serde(default = "default_pwm_frequency_hz")]
    pub pwm_frequency_hz: u32,
    #[serde(default)]
    pub controller: ControllerConfig,
}

const fn default_sensor_gpio() -> u8 {
    14
}

const fn default_light_gpio() -> u8 {
    13
}

/// Highest PWM frequency that still leaves 13 bits of duty resolution
pub const MAX_PWM_FREQUENCY_HZ: u32 = 5000;

const fn default_pwm_frequency_hz() -> u32 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            sensor_gpio: default_sensor_gpio(),
            light_gpio: default_light_gpio(),
            stop_button_gpio: 0, // Disabled by default
            pwm_frequency_hz: default_pwm_frequency_hz(),
            controller: ControllerConfig::default(),
        }
    }
}

impl Config {
    /// Clamp values to valid ranges and fix invalid values
    pub fn validate(&mut self) {
        if self.sensor_gpio == self.light_gpio {
            warn!(
                "Sensor and light share GPIO {}, resetting both to defaults",
                self.sensor_gpio
            );
            self.sensor_gpio = default_sensor_gpio();
            self.light_gpio = default_light_gpio();
        }
        if self.stop_button_gpio != 0
            && (self.stop_button_gpio == self.sensor_gpio || self.stop_button_gpio == self.light_gpio)
        {
            warn!("Stop button GPIO {} is already in use, disabling it", self.stop_button_gpio);
            self.stop_button_gpio = 0;
        }
        if self.pwm_frequency_hz == 0 {
            warn!("pwm_frequency_hz must be positive, resetting to default");
            self.pwm_frequency_hz = default_pwm_frequency_hz();
        }
        if self.pwm_frequency_hz > MAX_PWM_FREQUENCY_HZ {
            warn!("Clamping pwm_frequency_hz from {} to {MAX_PWM_FREQUENCY_HZ}", self.pwm_frequency_hz);
            self.pwm_frequency_hz = MAX_PWM_FREQUENCY_HZ;
        }
        self.controller.validate();
    }

    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(mut config) => {
                info!("Loaded embedded config");
                config.validate();
                config
            }
            Err(e) => {
                warn!("Failed to parse embedded config: {e}, using defaults");
                Self::default()
            }
        }
    }

    pub fn load() -> Result<Self> {
        debug!("Embedded config size: {} bytes", EMBEDDED_CONFIG.len());
        let config: Config = serde_json::from_str(EMBEDDED_CONFIG)?;
        debug!(
            "Config parsed: log_level={:?}, sensor_gpio={}, light_gpio={}",
            config.log_level, config.sensor_gpio, config.light_gpio
        );
        Ok(config)
    }
}
