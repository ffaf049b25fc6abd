//! Motion-to-light control loop
//!
//! One [`MotionLightController`] owns the sensor, the light output, the clock
//! and the delay. Each tick it:
//!
//! 1. reads the clock once and asks the debouncer for confirmed motion,
//! 2. on motion, records the time and fades the light in if it was off,
//! 3. if the light is on and the last motion is older than the timeout,
//!    fades it out,
//! 4. sleeps for the tick interval.
//!
//! Step 2 always runs before step 3, so motion arriving in the tick that
//! would otherwise time out keeps the light on instead of flickering it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use derive_more::Display;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, error, info};

use crate::clock::Clock;
use crate::config::ControllerConfig;
use crate::debounce::MotionDebouncer;
use crate::error::Fault;
use crate::ramp::BrightnessRamp;

/// Light state as seen by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum LightState {
    #[default]
    #[display("OFF")]
    Off,
    /// Fully on, not mid-ramp
    #[display("ON")]
    On,
}

/// Why [`MotionLightController::run`] returned. The light is off in both cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The stop signal was raised
    Interrupted,
    /// A hardware collaborator failed; the loop does not retry
    Faulted(Fault),
}

/// Transition taken by a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    FadedIn,
    FadedOut,
}

/// Running counters since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub ticks: u64,
    /// Ticks on which the debouncer confirmed motion
    pub motion_ticks: u64,
    pub fade_ins: u32,
    pub fade_outs: u32,
}

pub struct MotionLightController<S, P: SetDutyCycle, C, D> {
    debouncer: MotionDebouncer<S>,
    ramp: BrightnessRamp<P>,
    clock: C,
    delay: D,
    config: ControllerConfig,
    state: LightState,
    last_motion: Option<Duration>,
    last_status_log: Duration,
    stats: ControllerStats,
}

impl<S, P, C, D> MotionLightController<S, P, C, D>
where
    S: InputPin,
    P: SetDutyCycle,
    C: Clock,
    D: DelayNs,
{
    /// Build the controller. The configuration is validated and the gamma
    /// table is computed here, once.
    pub fn new(sensor: S, output: P, clock: C, delay: D, mut config: ControllerConfig) -> Self {
        config.validate();
        let ramp = BrightnessRamp::new(
            output,
            config.inverted_output,
            config.gamma_table_step,
            config.gamma,
        );
        Self {
            debouncer: MotionDebouncer::new(sensor, config.debounce_interval_ms),
            ramp,
            clock,
            delay,
            config,
            state: LightState::Off,
            last_motion: None,
            last_status_log: Duration::ZERO,
            stats: ControllerStats::default(),
        }
    }

    /// Run start-up and the control loop until `stop` is raised or a fault occurs.
    ///
    /// The light is forced off on every way out of this function, including
    /// a panic unwinding through it.
    pub fn run(&mut self, stop: &AtomicBool) -> ExitReason {
        let guard = LightGuard { controller: self };
        let reason = guard.controller.run_until_stopped(stop);
        drop(guard);
        reason
    }

    fn run_until_stopped(&mut self, stop: &AtomicBool) -> ExitReason {
        info!("Motion light controller started");
        match self.start_up(stop) {
            Ok(true) => {}
            Ok(false) => {
                info!("Stop requested during sensor stabilization");
                return ExitReason::Interrupted;
            }
            Err(fault) => {
                error!("Start-up fault: {fault}");
                return ExitReason::Faulted(fault);
            }
        }
        info!("System ready, monitoring for motion");

        loop {
            if stop.load(Ordering::Relaxed) {
                info!("Stop requested");
                return ExitReason::Interrupted;
            }
            if let Err(fault) = self.tick() {
                error!("Control loop fault: {fault}");
                return ExitReason::Faulted(fault);
            }
            self.delay.delay_ms(self.config.tick_interval_ms);
        }
    }

    /// Force the light off and wait out the PIR warm-up.
    ///
    /// PIR modules report spurious activity right after power-up. Returns
    /// `Ok(false)` if `stop` was raised during the wait.
    pub fn start_up(&mut self, stop: &AtomicBool) -> Result<bool, Fault> {
        self.ramp.light_off()?;
        self.state = LightState::Off;

        let total = self.config.stabilization_secs;
        if total > 0 {
            info!("Waiting {total} seconds for the PIR sensor to stabilize...");
        }
        for remaining in (1..=total).rev() {
            if stop.load(Ordering::Relaxed) {
                return Ok(false);
            }
            if remaining != total && remaining % 10 == 0 {
                info!("Stabilization: {remaining} seconds remaining...");
            }
            self.delay.delay_ms(1000);
        }

        self.last_status_log = self.clock.now();
        Ok(true)
    }

    /// Evaluate one tick of the state machine, without the trailing sleep.
    pub fn tick(&mut self) -> Result<TickOutcome, Fault> {
        let now = self.clock.now();
        self.stats.ticks += 1;
        let mut outcome = TickOutcome::Idle;

        if self.debouncer.confirm_motion(&mut self.delay)? {
            self.stats.motion_ticks += 1;
            self.last_motion = Some(now);

            if self.state == LightState::Off {
                info!("Motion detected, turning light on");
                self.ramp.fade_in(
                    &mut self.delay,
                    self.config.fade_step_percent,
                    self.config.fade_in_step_delay_ms,
                )?;
                self.state = LightState::On;
                self.stats.fade_ins += 1;
                outcome = TickOutcome::FadedIn;
            } else {
                debug!("Motion confirmed, timeout re-armed");
            }
        }

        if self.state == LightState::On && self.motion_timed_out(now) {
            info!("Motion timeout, turning light off");
            self.ramp.fade_out(
                &mut self.delay,
                self.config.fade_step_percent,
                self.config.fade_out_step_delay_ms,
            )?;
            self.state = LightState::Off;
            self.stats.fade_outs += 1;
            outcome = TickOutcome::FadedOut;
        }

        self.log_status(now);
        Ok(outcome)
    }

    fn motion_timed_out(&self, now: Duration) -> bool {
        let timeout = Duration::from_millis(self.config.motion_timeout_ms);
        self.last_motion
            .map_or(true, |last| now.saturating_sub(last) > timeout)
    }

    fn log_status(&mut self, now: Duration) {
        let interval = self.config.status_log_interval_secs;
        if interval == 0 {
            return;
        }
        if now.saturating_sub(self.last_status_log) >= Duration::from_secs(u64::from(interval)) {
            info!("Status: monitoring motion, light is {}", self.state);
            self.last_status_log = now;
        }
    }

    #[must_use]
    pub const fn state(&self) -> LightState {
        self.state
    }

    /// Clock time of the most recent confirmed motion
    #[must_use]
    pub const fn last_motion(&self) -> Option<Duration> {
        self.last_motion
    }

    /// Last brightness percentage written to the light
    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.ramp.brightness()
    }

    #[must_use]
    pub const fn stats(&self) -> ControllerStats {
        self.stats
    }

    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

/// Keeps the light "acquired" for the lifetime of the control loop and
/// releases it (forces it off) when dropped.
struct LightGuard<'a, S, P: SetDutyCycle, C, D> {
    controller: &'a mut MotionLightController<S, P, C, D>,
}

impl<S, P: SetDutyCycle, C, D> Drop for LightGuard<'_, S, P, C, D> {
    fn drop(&mut self) {
        match self.controller.ramp.light_off() {
            Ok(()) => info!("Light forced off"),
            Err(e) => error!("Failed to force light off: {e}"),
        }
        self.controller.state = LightState::Off;
    }
}
