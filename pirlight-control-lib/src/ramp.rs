//! Gamma-corrected brightness fades for a single PWM light.

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info};

use crate::error::Fault;
use crate::gamma::{build_gamma_table, GammaTable};

/// Drives one PWM channel through perceptually linear brightness levels.
///
/// Fades are blocking: they occupy the caller for `steps * step_delay` and
/// cannot be preempted. The last brightness written is tracked so callers can
/// observe where a ramp ended.
#[derive(Debug)]
pub struct BrightnessRamp<P> {
    output: P,
    table: GammaTable,
    inverted: bool,
    brightness: u8,
}

impl<P: SetDutyCycle> BrightnessRamp<P> {
    /// Wrap a PWM channel, sizing the gamma table to the channel's resolution.
    ///
    /// # Arguments
    /// * `output` - PWM channel driving the light
    /// * `inverted` - `true` when a higher duty cycle makes the light dimmer
    /// * `table_step` - Gamma table grid spacing in percent
    /// * `gamma` - Gamma correction exponent
    pub fn new(output: P, inverted: bool, table_step: u8, gamma: f32) -> Self {
        let max_raw = output.max_duty_cycle();
        let table = build_gamma_table(table_step, gamma, max_raw);
        debug!(
            "Brightness ramp: max duty {max_raw}, {} gamma points, inverted={inverted}",
            table.len()
        );
        Self {
            output,
            table,
            inverted,
            brightness: 0,
        }
    }

    /// Raw duty cycle written for a brightness percentage, polarity included
    #[must_use]
    pub fn duty_for(&self, percent: u8) -> u16 {
        let corrected = self.table.correct(percent);
        if self.inverted {
            self.table.max_raw().saturating_sub(corrected)
        } else {
            corrected
        }
    }

    /// Drive the light to `percent` (clamped to 100) immediately.
    pub fn set_brightness(&mut self, percent: u8) -> Result<(), Fault> {
        let percent = percent.min(100);
        let duty = self.duty_for(percent);
        self.output.set_duty_cycle(duty).map_err(Fault::output)?;
        self.brightness = percent;
        Ok(())
    }

    /// Ramp from 0% to 100%, ending at exactly 100% regardless of `step`.
    pub fn fade_in<D: DelayNs>(
        &mut self,
        delay: &mut D,
        step: u8,
        step_delay_ms: u32,
    ) -> Result<(), Fault> {
        for percent in (0..=100u8).step_by(usize::from(step.max(1))) {
            self.set_brightness(percent)?;
            delay.delay_ms(step_delay_ms);
        }
        self.set_brightness(100)?;
        info!("Light faded in (on)");
        Ok(())
    }

    /// Ramp from 100% to 0%, ending at exactly 0% regardless of `step`.
    pub fn fade_out<D: DelayNs>(
        &mut self,
        delay: &mut D,
        step: u8,
        step_delay_ms: u32,
    ) -> Result<(), Fault> {
        for percent in (0..=100u8).rev().step_by(usize::from(step.max(1))) {
            self.set_brightness(percent)?;
            delay.delay_ms(step_delay_ms);
        }
        self.set_brightness(0)?;
        info!("Light faded out (off)");
        Ok(())
    }

    /// Turn the light off without a fade
    pub fn light_off(&mut self) -> Result<(), Fault> {
        self.set_brightness(0)
    }

    /// Last brightness percentage successfully written
    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.inverted
    }

    #[must_use]
    pub const fn table(&self) -> &GammaTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{DutyLog, RecordingOutput, SimClock, SimDelay};
    use core::convert::Infallible;
    use embedded_hal::pwm::{Error, ErrorKind, ErrorType};
    use std::time::Duration;

    fn make_ramp(inverted: bool) -> (BrightnessRamp<RecordingOutput>, DutyLog) {
        let output = RecordingOutput::new(u16::MAX);
        let log = output.log();
        (BrightnessRamp::new(output, inverted, 10, 2.2), log)
    }

    #[test]
    fn test_normal_polarity_endpoints() {
        let (mut ramp, log) = make_ramp(false);
        ramp.set_brightness(100).unwrap();
        assert_eq!(log.last(), Some(u16::MAX));
        ramp.set_brightness(0).unwrap();
        assert_eq!(log.last(), Some(0));
    }

    #[test]
    fn test_inverted_polarity_endpoints() {
        let (mut ramp, log) = make_ramp(true);
        ramp.set_brightness(100).unwrap();
        assert_eq!(log.last(), Some(0));
        ramp.light_off().unwrap();
        assert_eq!(log.last(), Some(u16::MAX));
    }

    #[test]
    fn test_duty_monotonic_in_percent() {
        let (normal, _) = make_ramp(false);
        let (inverted, _) = make_ramp(true);
        for percent in 0..100 {
            assert!(normal.duty_for(percent + 1) >= normal.duty_for(percent));
            assert!(inverted.duty_for(percent + 1) <= inverted.duty_for(percent));
        }
    }

    #[test]
    fn test_fade_in_ends_at_full_for_uneven_steps() {
        for step in [3, 7, 30, 33, 100] {
            let (mut ramp, log) = make_ramp(false);
            let mut delay = SimDelay::new(SimClock::new());
            ramp.fade_in(&mut delay, step, 5).unwrap();

            assert_eq!(ramp.brightness(), 100, "step {step}");
            assert_eq!(log.last(), Some(u16::MAX), "step {step}");
            let writes = log.writes();
            assert!(writes.windows(2).all(|w| w[1] >= w[0]), "step {step} not monotonic");
        }
    }

    #[test]
    fn test_fade_out_ends_at_zero_for_uneven_steps() {
        for step in [3, 7, 30, 33, 100] {
            let (mut ramp, log) = make_ramp(true);
            ramp.set_brightness(100).unwrap();
            let mut delay = SimDelay::new(SimClock::new());
            ramp.fade_out(&mut delay, step, 5).unwrap();

            assert_eq!(ramp.brightness(), 0, "step {step}");
            // Inverted: off is full duty
            assert_eq!(log.last(), Some(u16::MAX), "step {step}");
            let writes = log.writes();
            assert!(writes.windows(2).all(|w| w[1] >= w[0]), "step {step} not monotonic");
        }
    }

    #[test]
    fn test_fade_duration_is_steps_times_delay() {
        let (mut ramp, _) = make_ramp(false);
        let clock = SimClock::new();
        let mut delay = SimDelay::new(clock.clone());

        // 0, 10, ..., 100 = 11 steps
        ramp.fade_in(&mut delay, 10, 3).unwrap();
        assert_eq!(clock.now_duration(), Duration::from_millis(33));
    }

    #[test]
    fn test_zero_step_is_treated_as_one() {
        let (mut ramp, log) = make_ramp(false);
        let mut delay = SimDelay::new(SimClock::new());
        ramp.fade_in(&mut delay, 0, 0).unwrap();
        // 101 steps plus the final forced write
        assert_eq!(log.writes().len(), 102);
    }

    #[test]
    fn test_negative_gamma_keeps_inverted_duty_in_range() {
        let output = RecordingOutput::new(1000);
        let log = output.log();
        let mut ramp = BrightnessRamp::new(output, true, 10, -1.0);

        for percent in 0..=100 {
            assert!(ramp.duty_for(percent) <= 1000, "{percent}%");
        }
        assert_eq!(ramp.duty_for(0), 1000);
        assert_eq!(ramp.duty_for(100), 0);
        ramp.set_brightness(50).unwrap();
        assert_eq!(log.last(), Some(ramp.duty_for(50)));
    }

    #[derive(Debug)]
    struct DriverFault;

    impl Error for DriverFault {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    struct DeadChannel;

    impl ErrorType for DeadChannel {
        type Error = DriverFault;
    }

    impl SetDutyCycle for DeadChannel {
        fn max_duty_cycle(&self) -> u16 {
            1023
        }

        fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), DriverFault> {
            Err(DriverFault)
        }
    }

    #[test]
    fn test_write_error_becomes_output_fault() {
        let mut ramp = BrightnessRamp::new(DeadChannel, false, 10, 2.2);
        let err = ramp.set_brightness(50).unwrap_err();
        assert!(matches!(err, Fault::Output { .. }));
        // Failed write does not move the tracked level
        assert_eq!(ramp.brightness(), 0);
    }

    #[test]
    fn test_infallible_channel_resolution_is_respected() {
        struct TenBit;
        impl ErrorType for TenBit {
            type Error = Infallible;
        }
        impl SetDutyCycle for TenBit {
            fn max_duty_cycle(&self) -> u16 {
                1023
            }
            fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
                assert!(duty <= 1023);
                Ok(())
            }
        }

        let mut ramp = BrightnessRamp::new(TenBit, true, 10, 2.2);
        assert_eq!(ramp.duty_for(0), 1023);
        assert_eq!(ramp.duty_for(100), 0);
        ramp.set_brightness(100).unwrap();
    }
}
