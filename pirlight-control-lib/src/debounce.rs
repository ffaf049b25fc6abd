//! PIR signal confirmation
//!
//! PIR modules produce short glitches from electrical noise and capacitive
//! coupling. A reading only counts as motion once several samples in quick
//! succession all agree.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

use crate::error::Fault;

/// Number of consecutive active samples required to confirm motion
pub const CONFIRMATION_SAMPLES: u8 = 3;

/// Default gap between confirmation samples
pub const DEFAULT_CONFIRM_INTERVAL_MS: u32 = 10;

/// Stateless three-sample debouncer around the PIR input pin.
///
/// The "no motion" path costs a single read and no delay. A candidate motion
/// reading costs up to `(CONFIRMATION_SAMPLES - 1) * interval_ms` of added
/// latency.
#[derive(Debug)]
pub struct MotionDebouncer<S> {
    sensor: S,
    interval_ms: u32,
}

impl<S: InputPin> MotionDebouncer<S> {
    pub fn new(sensor: S, interval_ms: u32) -> Self {
        Self {
            sensor,
            interval_ms,
        }
    }

    /// Returns `true` only if every one of [`CONFIRMATION_SAMPLES`] reads is active.
    pub fn confirm_motion<D: DelayNs>(&mut self, delay: &mut D) -> Result<bool, Fault> {
        if !self.read()? {
            return Ok(false);
        }
        for _ in 1..CONFIRMATION_SAMPLES {
            delay.delay_ms(self.interval_ms);
            if !self.read()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn read(&mut self) -> Result<bool, Fault> {
        self.sensor.is_high().map_err(Fault::sensor)
    }

    /// Give back the sensor pin
    pub fn release(self) -> S {
        self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::{Error, ErrorKind, ErrorType};
    use std::collections::VecDeque;

    /// Replays a fixed sequence of readings, inactive once exhausted
    struct SequenceSensor {
        readings: VecDeque<bool>,
        reads: usize,
    }

    impl SequenceSensor {
        fn new(readings: &[bool]) -> Self {
            Self {
                readings: readings.iter().copied().collect(),
                reads: 0,
            }
        }
    }

    impl ErrorType for SequenceSensor {
        type Error = Infallible;
    }

    impl InputPin for SequenceSensor {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            self.reads += 1;
            Ok(self.readings.pop_front().unwrap_or(false))
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ms: u32,
        calls: usize,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.calls += 1;
            self.total_ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.calls += 1;
            self.total_ms += ms;
        }
    }

    #[derive(Debug)]
    struct BrokenPin;

    impl Error for BrokenPin {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    struct FailingSensor;

    impl ErrorType for FailingSensor {
        type Error = BrokenPin;
    }

    impl InputPin for FailingSensor {
        fn is_high(&mut self) -> Result<bool, BrokenPin> {
            Err(BrokenPin)
        }

        fn is_low(&mut self) -> Result<bool, BrokenPin> {
            Err(BrokenPin)
        }
    }

    fn confirm(readings: &[bool]) -> (bool, usize, CountingDelay) {
        let mut debouncer = MotionDebouncer::new(SequenceSensor::new(readings), 10);
        let mut delay = CountingDelay::default();
        let confirmed = debouncer.confirm_motion(&mut delay).unwrap();
        (confirmed, debouncer.release().reads, delay)
    }

    #[test]
    fn test_three_active_reads_confirm() {
        let (confirmed, reads, delay) = confirm(&[true, true, true]);
        assert!(confirmed);
        assert_eq!(reads, 3);
        assert_eq!(delay.total_ms, 20);
    }

    #[test]
    fn test_any_inactive_read_rejects() {
        for readings in [
            [false, true, true],
            [true, false, true],
            [true, true, false],
            [false, false, false],
        ] {
            let (confirmed, _, _) = confirm(&readings);
            assert!(!confirmed, "{readings:?} should not confirm");
        }
    }

    #[test]
    fn test_inactive_first_read_costs_no_delay() {
        let (confirmed, reads, delay) = confirm(&[false, true, true]);
        assert!(!confirmed);
        assert_eq!(reads, 1);
        assert_eq!(delay.calls, 0);
    }

    #[test]
    fn test_glitch_stops_sampling_early() {
        let (confirmed, reads, delay) = confirm(&[true, false, true]);
        assert!(!confirmed);
        assert_eq!(reads, 2);
        assert_eq!(delay.total_ms, 10);
    }

    #[test]
    fn test_read_error_becomes_sensor_fault() {
        let mut debouncer = MotionDebouncer::new(FailingSensor, 10);
        let mut delay = CountingDelay::default();
        let err = debouncer.confirm_motion(&mut delay).unwrap_err();
        assert!(matches!(err, Fault::Sensor { .. }));
    }
}
