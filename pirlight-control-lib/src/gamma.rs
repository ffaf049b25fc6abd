//! Perceptual brightness correction
//!
//! LEDs respond linearly to duty cycle but the eye does not: a 50% duty cycle
//! looks much brighter than "half". Raising the linear brightness fraction to
//! a gamma exponent (~2.2) before scaling to the output resolution makes a
//! linear percentage ramp look uniform.

use log::warn;
use num_integer::Integer;
use smallvec::SmallVec;

/// Standard display gamma exponent
pub const DEFAULT_GAMMA: f32 = 2.2;

/// Default spacing between precomputed percentages
pub const DEFAULT_TABLE_STEP: u8 = 10;

/// Entries stored inline for the default step (0, 10, ..., 100)
const INLINE_ENTRIES: usize = 11;

/// Gamma lookup table over a coarse grid of brightness percentages.
///
/// Built once by [`build_gamma_table`] and immutable afterwards. The grid
/// always contains both 0 and 100, even when `step` does not divide 100, so
/// full brightness and full darkness are exact.
#[derive(Debug, Clone)]
pub struct GammaTable {
    step: u8,
    gamma: f32,
    max_raw: u16,
    /// `(percent, corrected raw duty)` sorted by percent
    entries: SmallVec<[(u8, u16); INLINE_ENTRIES]>,
}

/// Build the gamma lookup table.
///
/// # Arguments
/// * `step` - Grid spacing in percent, clamped to `1..=100`
/// * `gamma` - Correction exponent, [`DEFAULT_GAMMA`] if not a positive number
/// * `max_raw` - Raw output value corresponding to 100%
#[must_use]
pub fn build_gamma_table(step: u8, gamma: f32, max_raw: u16) -> GammaTable {
    let step = step.clamp(1, 100);
    let gamma = if gamma.is_finite() && gamma > 0.0 {
        gamma
    } else {
        warn!("Gamma {gamma} is not a positive number, using {DEFAULT_GAMMA}");
        DEFAULT_GAMMA
    };
    let mut entries: SmallVec<[(u8, u16); INLINE_ENTRIES]> = (0..=100u8)
        .step_by(usize::from(step))
        .map(|p| (p, gamma_formula(p, gamma, max_raw)))
        .collect();
    if entries.last().map(|&(p, _)| p) != Some(100) {
        entries.push((100, gamma_formula(100, gamma, max_raw)));
    }
    GammaTable {
        step,
        gamma,
        max_raw,
        entries,
    }
}

/// `round((percent / 100) ^ gamma * max_raw)`
#[inline]
fn gamma_formula(percent: u8, gamma: f32, max_raw: u16) -> u16 {
    let fraction = f32::from(percent.min(100)) / 100.0;
    // Saturating cast; the result never exceeds max_raw
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let corrected = (fraction.powf(gamma) * f32::from(max_raw)).round() as u16;
    corrected.min(max_raw)
}

impl GammaTable {
    /// Corrected raw duty for a linear brightness percentage.
    ///
    /// The percentage is clamped to 100 and rounded down to the table grid.
    #[must_use]
    pub fn correct(&self, percent: u8) -> u16 {
        let percent = percent.min(100);
        let key = if percent == 100 {
            100
        } else {
            percent.prev_multiple_of(&self.step)
        };
        match self.entries.binary_search_by_key(&key, |&(p, _)| p) {
            Ok(idx) => self.entries[idx].1,
            Err(_) => gamma_formula(percent, self.gamma, self.max_raw),
        }
    }

    /// Raw output value corresponding to 100%
    #[must_use]
    pub const fn max_raw(&self) -> u16 {
        self.max_raw
    }

    #[must_use]
    pub const fn step(&self) -> u8 {
        self.step
    }

    /// Number of grid points in the table
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_endpoints() {
        let table = build_gamma_table(DEFAULT_TABLE_STEP, DEFAULT_GAMMA, u16::MAX);

        assert_eq!(table.len(), 11);
        assert_eq!(table.correct(0), 0);
        assert_eq!(table.correct(100), u16::MAX);
    }

    #[test]
    fn test_known_midpoint_value() {
        let table = build_gamma_table(10, 2.2, u16::MAX);
        // 0.5^2.2 * 65535 = 14263.3
        let mid = table.correct(50);
        assert!((14262..=14264).contains(&mid), "got {mid}");
    }

    #[test]
    fn test_rounds_down_to_grid() {
        let table = build_gamma_table(10, 2.2, u16::MAX);
        assert_eq!(table.correct(37), table.correct(30));
        assert_eq!(table.correct(99), table.correct(90));
        assert_ne!(table.correct(99), table.correct(100));
    }

    #[test]
    fn test_uneven_step_still_reaches_full_scale() {
        let table = build_gamma_table(30, 2.2, 8191);

        // Grid: 0, 30, 60, 90, 100
        assert_eq!(table.len(), 5);
        assert_eq!(table.correct(100), 8191);
        assert_eq!(table.correct(95), table.correct(90));
    }

    #[test]
    fn test_out_of_range_percent_is_clamped() {
        let table = build_gamma_table(10, 2.2, 1000);
        assert_eq!(table.correct(250), 1000);
    }

    #[test]
    fn test_step_is_clamped() {
        let table = build_gamma_table(0, 2.2, 1000);
        assert_eq!(table.step(), 1);
        assert_eq!(table.len(), 101);

        let table = build_gamma_table(200, 2.2, 1000);
        assert_eq!(table.step(), 100);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_monotonic_non_decreasing() {
        for step in [1, 7, 10, 25] {
            let table = build_gamma_table(step, DEFAULT_GAMMA, u16::MAX);
            let mut previous = 0;
            for percent in 0..=100 {
                let value = table.correct(percent);
                assert!(value >= previous, "step {step}: {percent}% dropped to {value}");
                previous = value;
            }
        }
    }

    #[test]
    fn test_invalid_gamma_falls_back_to_default() {
        let reference = build_gamma_table(10, DEFAULT_GAMMA, 1000);
        for gamma in [-1.0, 0.0, f32::NAN, f32::INFINITY] {
            let table = build_gamma_table(10, gamma, 1000);
            for percent in 0..=100 {
                assert!(table.correct(percent) <= table.max_raw(), "gamma {gamma}: {percent}%");
                assert_eq!(table.correct(percent), reference.correct(percent), "gamma {gamma}");
            }
        }
    }

    #[test]
    fn test_formula_never_exceeds_max_raw() {
        assert_eq!(gamma_formula(50, -1.0, 1000), 1000);
        assert_eq!(gamma_formula(0, -1.0, 1000), 1000);
        assert_eq!(gamma_formula(100, 0.5, 1000), 1000);
    }

    #[test]
    fn test_lookup_is_repeatable() {
        let table = build_gamma_table(10, DEFAULT_GAMMA, u16::MAX);
        for percent in 0..=100 {
            assert_eq!(table.correct(percent), table.correct(percent));
        }
    }
}
