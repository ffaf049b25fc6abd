//! Motion-activated light control for PIR sensors
//!
//! This library holds the logic that decides when a PIR-triggered light
//! fades on and off: debounced motion confirmation, gamma-corrected PWM
//! fades and the timeout state machine, plus a field diagnostic for the
//! sensor itself. It is hardware-agnostic (everything talks to
//! `embedded-hal` traits) and can be tested without embedded hardware
//! using the virtual-time doubles in [`sim`].

pub mod clock;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod diagnostic;
pub mod error;
pub mod gamma;
pub mod ramp;
pub mod sim;

pub use clock::{Clock, MonotonicClock};
pub use config::{ControllerConfig, DiagnosticConfig};
pub use controller::{ControllerStats, ExitReason, LightState, MotionLightController, TickOutcome};
pub use debounce::MotionDebouncer;
pub use diagnostic::{DiagnosticReport, Diagnosis, Phase, PirDiagnostic, WindowReadings};
pub use error::Fault;
pub use gamma::{build_gamma_table, GammaTable};
pub use ramp::BrightnessRamp;
