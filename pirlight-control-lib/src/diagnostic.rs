//! PIR sensor field diagnostic
//!
//! Walks an operator through three timed sampling windows and classifies the
//! sensor from the readings:
//!
//! | Window   | Operator        | Healthy sensor       |
//! |----------|-----------------|----------------------|
//! | Baseline | stays still     | all readings LOW     |
//! | Movement | moves in front  | at least one HIGH    |
//! | Recovery | stays still     | at least one LOW     |
//!
//! Shares no state with the controller, only the collaborator traits.

use derive_more::Display;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::{info, warn};
use std::time::Duration;

use crate::clock::Clock;
use crate::config::DiagnosticConfig;
use crate::error::Fault;

/// A timed sampling window of the diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    #[display("BASELINE")]
    Baseline,
    #[display("MOVEMENT")]
    Movement,
    #[display("RECOVERY")]
    Recovery,
}

impl Phase {
    /// Instruction shown to the operator before the window starts
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::Baseline | Self::Recovery => "Please remain still",
            Self::Movement => "Please move in front of the sensor",
        }
    }
}

/// Readings taken during one window (`true` = HIGH)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowReadings {
    pub phase: Phase,
    pub samples: Vec<bool>,
}

impl WindowReadings {
    #[must_use]
    pub fn high_count(&self) -> usize {
        self.samples.iter().filter(|&&high| high).count()
    }

    #[must_use]
    pub fn low_count(&self) -> usize {
        self.samples.len() - self.high_count()
    }

    /// Every sample HIGH. Vacuously true for an empty window.
    #[must_use]
    pub fn all_high(&self) -> bool {
        self.samples.iter().all(|&high| high)
    }

    /// Every sample LOW. Vacuously true for an empty window.
    #[must_use]
    pub fn all_low(&self) -> bool {
        !self.any_high()
    }

    #[must_use]
    pub fn any_high(&self) -> bool {
        self.samples.iter().any(|&high| high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineFinding {
    /// All LOW with nobody moving
    Clean,
    /// All HIGH with nobody moving
    StuckHigh,
    /// Some HIGH with nobody moving
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementFinding {
    Detected,
    NothingDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryFinding {
    /// Returned LOW at least once after movement stopped
    Recovered,
    StuckHigh,
}

/// Overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    /// HIGH throughout both still windows
    StuckHigh,
    /// Never HIGH while the operator was moving
    NotDetecting,
    Working,
}

impl Diagnosis {
    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Self::StuckHigh => "The PIR sensor appears to be STUCK in the HIGH state.",
            Self::NotDetecting => "The PIR sensor is NOT DETECTING motion.",
            Self::Working => "The PIR sensor appears to be WORKING as expected.",
        }
    }

    #[must_use]
    pub const fn recommendations(self) -> &'static [&'static str] {
        match self {
            Self::StuckHigh => &[
                "Check wiring, especially the GND connection",
                "Try a different GPIO pin, with an internal pull-down if available",
                "Look for interference: heat sources, vibration, RF",
                "Check the supply voltage (2.7V-12V, ideally 3.3V)",
                "Try a different sensor",
            ],
            Self::NotDetecting => &[
                "Check wiring, especially that power is connected",
                "Check sensor orientation: the lens should face the detection area",
                "Move closer to the sensor",
                "Check the lens for physical obstructions",
                "Try a different sensor",
            ],
            Self::Working => &[
                "Allow a generous stabilization time after power-up",
                "Debounce motion readings in the controller",
                "Account for the sensor's fixed 2-3 second hold time after motion stops",
            ],
        }
    }
}

/// Classify the baseline window
#[must_use]
pub fn baseline_finding(baseline: &WindowReadings) -> BaselineFinding {
    if baseline.all_high() {
        BaselineFinding::StuckHigh
    } else if baseline.all_low() {
        BaselineFinding::Clean
    } else {
        BaselineFinding::Mixed
    }
}

/// Classify the movement window
#[must_use]
pub fn movement_finding(movement: &WindowReadings) -> MovementFinding {
    if movement.any_high() {
        MovementFinding::Detected
    } else {
        MovementFinding::NothingDetected
    }
}

/// Classify the recovery window
#[must_use]
pub fn recovery_finding(recovery: &WindowReadings) -> RecoveryFinding {
    if recovery.all_high() {
        RecoveryFinding::StuckHigh
    } else {
        RecoveryFinding::Recovered
    }
}

/// Combine the three windows into a verdict.
///
/// Stuck-high takes precedence over no-detection: a sensor stuck HIGH also
/// "detects" during the movement window.
#[must_use]
pub fn diagnose(
    baseline: &WindowReadings,
    movement: &WindowReadings,
    recovery: &WindowReadings,
) -> Diagnosis {
    if baseline.all_high() && recovery.all_high() {
        Diagnosis::StuckHigh
    } else if !movement.any_high() {
        Diagnosis::NotDetecting
    } else {
        Diagnosis::Working
    }
}

/// Outcome of a complete diagnostic run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub baseline: WindowReadings,
    pub movement: WindowReadings,
    pub recovery: WindowReadings,
    pub diagnosis: Diagnosis,
}

impl DiagnosticReport {
    #[must_use]
    pub fn new(baseline: WindowReadings, movement: WindowReadings, recovery: WindowReadings) -> Self {
        let diagnosis = diagnose(&baseline, &movement, &recovery);
        Self {
            baseline,
            movement,
            recovery,
            diagnosis,
        }
    }

    /// Emit the analysis and diagnosis through the logger
    pub fn log(&self) {
        info!("===== ANALYSIS =====");
        for window in [&self.baseline, &self.movement, &self.recovery] {
            info!(
                "{} results: {} HIGH, {} LOW readings",
                window.phase,
                window.high_count(),
                window.low_count()
            );
        }

        match baseline_finding(&self.baseline) {
            BaselineFinding::StuckHigh => warn!("ISSUE: sensor is STUCK HIGH during baseline (no movement)"),
            BaselineFinding::Clean => info!("GOOD: sensor reads LOW when there is no movement"),
            BaselineFinding::Mixed => warn!("WARNING: mixed readings during baseline: {:?}", self.baseline.samples),
        }
        match movement_finding(&self.movement) {
            MovementFinding::Detected => info!("GOOD: sensor detected movement during the movement test"),
            MovementFinding::NothingDetected => warn!("ISSUE: sensor failed to detect any movement"),
        }
        match recovery_finding(&self.recovery) {
            RecoveryFinding::Recovered => info!("GOOD: sensor returned LOW after movement stopped"),
            RecoveryFinding::StuckHigh => warn!("ISSUE: sensor remained HIGH after movement stopped"),
        }

        info!("===== DIAGNOSIS =====");
        info!("{}", self.diagnosis.summary());
        info!("Recommendations:");
        for (i, line) in self.diagnosis.recommendations().iter().enumerate() {
            info!("{}. {line}", i + 1);
        }
    }
}

/// Runs the timed diagnostic against a sensor
pub struct PirDiagnostic<S, C, D> {
    sensor: S,
    clock: C,
    delay: D,
    config: DiagnosticConfig,
}

impl<S, C, D> PirDiagnostic<S, C, D>
where
    S: InputPin,
    C: Clock,
    D: DelayNs,
{
    pub fn new(sensor: S, clock: C, delay: D, mut config: DiagnosticConfig) -> Self {
        config.validate();
        Self {
            sensor,
            clock,
            delay,
            config,
        }
    }

    /// Stabilize, sample all three windows, and classify.
    pub fn run(&mut self) -> Result<DiagnosticReport, Fault> {
        info!("===== PIR SENSOR DIAGNOSTIC =====");
        self.stabilize();
        info!("Beginning test sequence. Stay still, then move in front of the sensor when prompted.");

        let baseline = self.sample_window(Phase::Baseline)?;
        let movement = self.sample_window(Phase::Movement)?;
        let recovery = self.sample_window(Phase::Recovery)?;

        let report = DiagnosticReport::new(baseline, movement, recovery);
        report.log();
        Ok(report)
    }

    fn stabilize(&mut self) {
        let total = self.config.stabilization_secs;
        if total == 0 {
            return;
        }
        info!("Waiting {total} seconds for the sensor to stabilize...");
        for remaining in (1..=total).rev() {
            if remaining != total && remaining % 10 == 0 {
                info!("{remaining} seconds remaining for stabilization...");
            }
            self.delay.delay_ms(1000);
        }
    }

    /// Prompt the operator, let them settle, then sample for one window.
    pub fn sample_window(&mut self, phase: Phase) -> Result<WindowReadings, Fault> {
        let window = Duration::from_secs(u64::from(self.config.window_secs));
        info!("--- {phase} TEST ---");
        info!("{} for {} seconds...", phase.prompt(), self.config.window_secs);
        self.delay.delay_ms(self.config.settle_secs.saturating_mul(1000));

        let mut samples = Vec::new();
        let start = self.clock.now();
        while self.clock.now().saturating_sub(start) < window {
            samples.push(self.sensor.is_high().map_err(Fault::sensor)?);
            self.delay.delay_ms(self.config.sample_interval_ms);
        }

        let readings = WindowReadings { phase, samples };
        info!(
            "{phase} results: {} HIGH, {} LOW readings",
            readings.high_count(),
            readings.low_count()
        );
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ScriptedSensor, SimClock, SimDelay};

    fn window(phase: Phase, samples: &[bool]) -> WindowReadings {
        WindowReadings {
            phase,
            samples: samples.to_vec(),
        }
    }

    fn quick_config() -> DiagnosticConfig {
        DiagnosticConfig {
            stabilization_secs: 0,
            settle_secs: 3,
            window_secs: 10,
            sample_interval_ms: 500,
        }
    }

    #[test]
    fn test_counts() {
        let w = window(Phase::Movement, &[true, false, true, true]);
        assert_eq!(w.high_count(), 3);
        assert_eq!(w.low_count(), 1);
        assert!(w.any_high());
        assert!(!w.all_high());
        assert!(!w.all_low());
    }

    #[test]
    fn test_findings() {
        assert_eq!(baseline_finding(&window(Phase::Baseline, &[false, false])), BaselineFinding::Clean);
        assert_eq!(baseline_finding(&window(Phase::Baseline, &[true, true])), BaselineFinding::StuckHigh);
        assert_eq!(baseline_finding(&window(Phase::Baseline, &[true, false])), BaselineFinding::Mixed);

        assert_eq!(movement_finding(&window(Phase::Movement, &[false, true])), MovementFinding::Detected);
        assert_eq!(
            movement_finding(&window(Phase::Movement, &[false, false])),
            MovementFinding::NothingDetected
        );

        assert_eq!(recovery_finding(&window(Phase::Recovery, &[true, false])), RecoveryFinding::Recovered);
        assert_eq!(recovery_finding(&window(Phase::Recovery, &[true, true])), RecoveryFinding::StuckHigh);
    }

    #[test]
    fn test_stuck_high_takes_precedence() {
        let all_high = [true; 4];
        let diagnosis = diagnose(
            &window(Phase::Baseline, &all_high),
            &window(Phase::Movement, &all_high),
            &window(Phase::Recovery, &all_high),
        );
        assert_eq!(diagnosis, Diagnosis::StuckHigh);
    }

    #[test]
    fn test_stuck_high_needs_both_still_windows() {
        // Recovered at least once: not stuck, and movement was seen
        let diagnosis = diagnose(
            &window(Phase::Baseline, &[true, true]),
            &window(Phase::Movement, &[true, true]),
            &window(Phase::Recovery, &[true, false]),
        );
        assert_eq!(diagnosis, Diagnosis::Working);
    }

    #[test]
    fn test_not_detecting() {
        let diagnosis = diagnose(
            &window(Phase::Baseline, &[false, false]),
            &window(Phase::Movement, &[false, false]),
            &window(Phase::Recovery, &[false, false]),
        );
        assert_eq!(diagnosis, Diagnosis::NotDetecting);
    }

    #[test]
    fn test_recommendations_present_for_every_diagnosis() {
        for diagnosis in [Diagnosis::StuckHigh, Diagnosis::NotDetecting, Diagnosis::Working] {
            assert!(!diagnosis.recommendations().is_empty());
            assert!(!diagnosis.summary().is_empty());
        }
    }

    #[test]
    fn test_window_takes_twenty_samples() {
        let clock = SimClock::new();
        let sensor = ScriptedSensor::idle(clock.clone());
        let delay = SimDelay::new(clock.clone());
        let mut diag = PirDiagnostic::new(sensor, clock.clone(), delay, quick_config());

        let readings = diag.sample_window(Phase::Baseline).unwrap();

        assert_eq!(readings.samples.len(), 20);
        assert_eq!(readings.low_count(), 20);
        // 3s settle + 20 * 0.5s sampling
        assert_eq!(clock.now(), Duration::from_secs(13));
    }

    #[test]
    fn test_full_run_with_healthy_sensor() {
        let clock = SimClock::new();
        // Baseline samples 3s..13s, movement 16s..26s, recovery 29s..39s.
        // The sensor holds HIGH a couple of seconds after movement stops.
        let sensor = ScriptedSensor::new(
            clock.clone(),
            vec![Duration::from_secs(17)..Duration::from_secs(31)],
        );
        let delay = SimDelay::new(clock.clone());
        let mut diag = PirDiagnostic::new(sensor, clock.clone(), delay, quick_config());

        let report = diag.run().unwrap();

        assert_eq!(baseline_finding(&report.baseline), BaselineFinding::Clean);
        assert_eq!(movement_finding(&report.movement), MovementFinding::Detected);
        assert_eq!(recovery_finding(&report.recovery), RecoveryFinding::Recovered);
        assert_eq!(report.diagnosis, Diagnosis::Working);
        assert_eq!(report.recovery.high_count(), 4);
    }

    #[test]
    fn test_full_run_with_stuck_sensor() {
        let clock = SimClock::new();
        let sensor = ScriptedSensor::new(clock.clone(), vec![Duration::ZERO..Duration::from_secs(3600)]);
        let delay = SimDelay::new(clock.clone());
        let config = DiagnosticConfig {
            stabilization_secs: 60,
            ..quick_config()
        };
        let mut diag = PirDiagnostic::new(sensor, clock.clone(), delay, config);

        let report = diag.run().unwrap();

        assert_eq!(report.diagnosis, Diagnosis::StuckHigh);
        assert_eq!(clock.now(), Duration::from_secs(60 + 3 * 13));
    }
}
