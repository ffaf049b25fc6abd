use anyhow::Result;
use log::{info, warn, LevelFilter};
use pirlight_control_lib::DiagnosticConfig;
use serde::{Deserialize, Serialize};

const EMBEDDED_CONFIG: &str = include_str!(concat!(env!("OUT_DIR"), "/pirlight-diagnostic.json"));

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
    /// PIR sensor output under test
    #[serde(default = "default_sensor_gpio")]
    pub sensor_gpio: u8,
    #[serde(default)]
    pub diagnostic: DiagnosticConfig,
}

const fn default_sensor_gpio() -> u8 {
    14
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            sensor_gpio: default_sensor_gpio(),
            diagnostic: DiagnosticConfig::default(),
        }
    }
}

impl Config {
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(mut config) => {
                info!("Loaded embedded config");
                config.diagnostic.validate();
                config
            }
            Err(e) => {
                warn!("Failed to parse embedded config: {e}, using defaults");
                Self::default()
            }
        }
    }

    pub fn load() -> Result<Self> {
        Ok(serde_json::from_str(EMBEDDED_CONFIG)?)
    }
}
