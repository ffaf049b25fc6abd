//! Faults raised by the hardware collaborators.

use core::fmt::Debug;
use derive_more::{Display, Error};

/// A failed interaction with the sensor or the light output.
///
/// Hardware error types differ per platform, so the error is captured as its
/// `Debug` rendering at the point of failure. A fault is fatal for the control
/// loop: there is no partial state to resume from other than "light off".
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum Fault {
    /// Reading the motion sensor input failed
    #[display("sensor read failed: {message}")]
    Sensor { message: String },
    /// Writing a duty cycle to the light output failed
    #[display("light output write failed: {message}")]
    Output { message: String },
}

impl Fault {
    pub fn sensor(err: impl Debug) -> Self {
        Self::Sensor {
            message: format!("{err:?}"),
        }
    }

    pub fn output(err: impl Debug) -> Self {
        Self::Output {
            message: format!("{err:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_source_message() {
        let fault = Fault::sensor("pin 14 not configured");
        assert_eq!(fault.to_string(), "sensor read failed: \"pin 14 not configured\"");

        let fault = Fault::output(42);
        assert_eq!(fault.to_string(), "light output write failed: 42");
    }
}
