//! Virtual-time doubles for the hardware collaborators
//!
//! These let the real controller and diagnostic run on a host without
//! sleeping: [`SimDelay`] advances a shared [`SimClock`] instead of blocking,
//! [`ScriptedSensor`] reports motion during configured time windows and
//! [`RecordingOutput`] keeps every duty cycle written to it.

use core::convert::Infallible;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::clock::Clock;

/// Shared virtual clock with nanosecond resolution.
///
/// Clones observe and advance the same time.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    nanos: Arc<AtomicU64>,
}

impl SimClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward
    pub fn advance(&self, by: Duration) {
        // u64 nanoseconds covers ~584 years
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    #[must_use]
    pub fn now_duration(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        self.now_duration()
    }
}

/// Delay that advances a [`SimClock`] instead of sleeping.
///
/// Optionally raises a stop flag once virtual time reaches a deadline, which
/// stands in for an operator pressing the stop button at a given moment.
#[derive(Debug, Clone)]
pub struct SimDelay {
    clock: SimClock,
    stop_at: Option<(Duration, Arc<AtomicBool>)>,
}

impl SimDelay {
    #[must_use]
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            stop_at: None,
        }
    }

    /// Set `flag` once virtual time reaches `deadline`
    #[must_use]
    pub fn with_stop_at(mut self, deadline: Duration, flag: Arc<AtomicBool>) -> Self {
        self.stop_at = Some((deadline, flag));
        self
    }

    fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        if let Some((deadline, flag)) = &self.stop_at {
            if self.clock.now_duration() >= *deadline {
                flag.store(true, Ordering::Relaxed);
            }
        }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        self.advance(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(Duration::from_millis(u64::from(ms)));
    }
}

/// PIR input that reads active while virtual time is inside any window.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    clock: SimClock,
    windows: Vec<Range<Duration>>,
    reads: Arc<AtomicU64>,
}

impl ScriptedSensor {
    #[must_use]
    pub fn new(clock: SimClock, windows: Vec<Range<Duration>>) -> Self {
        Self {
            clock,
            windows,
            reads: Arc::default(),
        }
    }

    /// Sensor that is never active
    #[must_use]
    pub fn idle(clock: SimClock) -> Self {
        Self::new(clock, Vec::new())
    }

    /// Total number of reads taken from this sensor and its clones
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn active(&self) -> bool {
        let now = self.clock.now_duration();
        self.windows.iter().any(|w| w.contains(&now))
    }
}

impl digital::ErrorType for ScriptedSensor {
    type Error = Infallible;
}

impl InputPin for ScriptedSensor {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.active())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

/// Shared record of duty cycle writes
#[derive(Debug, Clone, Default)]
pub struct DutyLog {
    writes: Arc<Mutex<Vec<u16>>>,
}

impl DutyLog {
    fn push(&self, duty: u16) {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(duty);
        }
    }

    /// All writes so far, oldest first
    #[must_use]
    pub fn writes(&self) -> Vec<u16> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Most recent write
    #[must_use]
    pub fn last(&self) -> Option<u16> {
        self.writes.lock().ok().and_then(|w| w.last().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.lock().map(|w| w.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// PWM channel that records every duty cycle into a [`DutyLog`].
#[derive(Debug, Clone)]
pub struct RecordingOutput {
    max_duty: u16,
    log: DutyLog,
}

impl RecordingOutput {
    #[must_use]
    pub fn new(max_duty: u16) -> Self {
        Self {
            max_duty,
            log: DutyLog::default(),
        }
    }

    /// Handle onto the write log, valid after the output is moved away
    #[must_use]
    pub fn log(&self) -> DutyLog {
        self.log.clone()
    }
}

impl pwm::ErrorType for RecordingOutput {
    type Error = Infallible;
}

impl SetDutyCycle for RecordingOutput {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.log.push(duty.min(self.max_duty));
        Ok(())
    }
}
